//! Prompt templates for the LLM-backed steps
//!
//! The templates carry the collaborator contracts the rest of the pipeline
//! relies on: the exact JSON keys the analyze step must return, the
//! `REPRODUCED` marker, and the `/screenshots/` write restriction.

/// Analyze: free-text bug report → structured reproduction intent.
pub fn analyze_prompt(bug_report: &str, target_url: &str) -> String {
    format!(
        "You are a QA engineer triaging a web bug report. Analyze the bug report \
below and break it into a structured reproduction plan.\n\
\n\
Bug report:\n\
{bug_report}\n\
\n\
Target URL: {target_url}\n\
\n\
Return ONLY raw JSON with exactly these keys:\n\
- \"inferred_steps\": ordered list of user actions that reproduce the bug\n\
- \"target_elements\": CSS selectors the steps interact with\n\
- \"expected_behavior\": what should happen if the application worked\n\
- \"success_condition\": the observable evidence that the bug is reproduced\n\
- \"risk_factors\": things that could make reproduction flaky\n"
    )
}

/// Appended once when the analyze response does not parse.
pub const ANALYZE_RETRY_SUFFIX: &str =
    "\n\nYour previous response was not valid JSON. Return ONLY raw JSON.";

/// Generate: structured analysis → runnable reproduction script.
pub fn generate_prompt(analysis_json: &str, target_url: &str, prior_failures: &str) -> String {
    format!(
        "You are a Selenium automation expert. Write a Python script that \
reproduces the bug described by this analysis.\n\
\n\
Analysis:\n\
{analysis_json}\n\
\n\
Target URL: {target_url}\n\
\n\
Failed approaches from earlier attempts:\n\
{prior_failures}\n\
\n\
Rules:\n\
- Use selenium with headless Chromium (/usr/bin/chromium, /usr/bin/chromedriver).\n\
- print() a short progress line before each step.\n\
- Save screenshots only under /screenshots/.\n\
- If and only if the bug is confirmed, print the exact token REPRODUCED.\n\
- Do not import os, subprocess, socket, shutil, sys, or pathlib.\n\
- Return ONLY the script, no prose and no markdown fences.\n"
    )
}

/// Appended once when the generated script does not parse.
pub fn generate_retry_suffix(reason: &str) -> String {
    format!("\n\nSyntax error: {reason}. Fix it and return ONLY the corrected script.")
}

/// Refine: previous script + failure feedback → corrected script with a
/// leading two-line note.
pub fn refine_prompt(previous_script: &str, failure_json: &str, history_summary: &str) -> String {
    format!(
        "The previously generated reproduction script failed. Rewrite it using \
the failure feedback below.\n\
\n\
PREVIOUS SCRIPT:\n\
{previous_script}\n\
\n\
FAILURE:\n\
{failure_json}\n\
\n\
HISTORY:\n\
{history_summary}\n\
\n\
Rules:\n\
- Start the reply with exactly two `#` comment lines explaining what went \
wrong and what you changed.\n\
- Then return the full corrected script, no prose and no markdown fences.\n\
- Keep the REPRODUCED marker contract and the /screenshots/ restriction.\n"
    )
}
