use regex::Regex;
use std::sync::OnceLock;

fn leading_fence_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // Opening fence with an optional language tag, e.g. ```json
        Regex::new(r"^\s*```[A-Za-z0-9_-]*[ \t]*\r?\n?").expect("valid leading fence regex")
    })
}

fn trailing_fence_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\r?\n?[ \t]*```\s*$").expect("valid trailing fence regex"))
}

/// Removes a surrounding Markdown code fence, if any.
///
/// Models frequently wrap JSON in ```json ... ``` even when asked not to.
pub fn strip_code_fences(text: &str) -> String {
    let out = leading_fence_re().replace(text, "");
    let out = trailing_fence_re().replace(&out, "");
    out.trim().to_string()
}

/// Returns the reply only if it has non-whitespace content.
pub fn accept_reply_text(text: Option<String>) -> Option<String> {
    text.filter(|t| !t.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_json_fence() {
        let input = "```json\n[{\"name\":\"Cough\"}]\n```";
        assert_eq!(strip_code_fences(input), "[{\"name\":\"Cough\"}]");
    }

    #[test]
    fn strips_bare_fence_and_whitespace() {
        let input = "  ```\n[]\n```  \n";
        assert_eq!(strip_code_fences(input), "[]");
    }

    #[test]
    fn leaves_unfenced_text_alone() {
        assert_eq!(strip_code_fences(" [1, 2] "), "[1, 2]");
    }

    #[test]
    fn reply_text_requires_content() {
        assert_eq!(accept_reply_text(None), None);
        assert_eq!(accept_reply_text(Some(" \n\t".into())), None);
        assert_eq!(accept_reply_text(Some("ok".into())), Some("ok".into()));
    }
}
