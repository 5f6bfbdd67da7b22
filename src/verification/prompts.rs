//! Prompt builders for the three verification stages

use crate::models::PageSnapshot;

const ROLE: &str = "You are a senior software development engineer in test (SDET) verifying the outcome of test steps performed on a web page.";

pub(crate) fn analysis_system(criteria: &str, snapshot: &PageSnapshot) -> String {
    format!(
        r#"{role}
You will receive the current page contents and the acceptance criteria of a test step. Analyze step by step whether the acceptance criteria are met and report the outcome in detail.

Context:
- The browser is already open.
- Current page URL: {url}
- Current page title: {title}
- Page outline:
```
{content}
```

Key points:
- Analyze the page contents and the acceptance criteria carefully, clause by clause.
- Consider only what the acceptance criteria state explicitly. Ignore anything the criteria do not mention.
- For each part of the criteria, say whether it is met and describe any problems found.

Acceptance criteria: {criteria}
"#,
        role = ROLE,
        url = snapshot.url,
        title = snapshot.title,
        content = snapshot.content,
        criteria = criteria,
    )
}

pub(crate) const ANALYSIS_USER: &str =
    "Verify the page contents against the acceptance criteria step by step and return a detailed textual result.";

pub(crate) fn judgment_system(analysis: &str) -> String {
    format!(
        r#"{role}
You will receive a detailed verification result and must decide whether the acceptance criteria of the test step were met.

Key points:
- Read the verification result carefully.
- Your answer must be a single boolean value and nothing else.
- Answer true if the acceptance criteria are met, otherwise answer false.

Detailed verification result: {analysis}
"#,
        role = ROLE,
        analysis = analysis,
    )
}

pub(crate) const JUDGMENT_USER: &str =
    "Return a single boolean value stating whether the acceptance criteria are met.";

pub(crate) fn reason_system(analysis: &str) -> String {
    format!(
        r#"{role}
You will receive a detailed verification result for a test step whose acceptance criteria were not met. Describe briefly why.

Key points:
- Read the verification result carefully.
- Give a short description (at most 200 characters) of the problems that caused the verification to fail.

Detailed verification result: {analysis}
"#,
        role = ROLE,
        analysis = analysis,
    )
}

pub(crate) const REASON_USER: &str =
    "Briefly describe why the acceptance criteria were not met.";
