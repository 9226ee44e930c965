//! Property-based tests for command parsing.

use pixelpals_app::Command;
use proptest::prelude::*;

proptest! {
    #[test]
    fn prop_plain_text_is_a_message(text in "[a-zA-Z0-9 ,.!?]{0,40}") {
        let parsed = Command::parse(&text);
        let trimmed = text.trim();

        // PROPERTY: text without a leading slash is never rejected.
        if trimmed.is_empty() {
            prop_assert_eq!(parsed, Ok(None));
        } else {
            prop_assert_eq!(parsed, Ok(Some(Command::Say(trimmed.to_string()))));
        }
    }

    #[test]
    fn prop_parse_never_panics(line in "\\PC{0,60}") {
        // PROPERTY: any input yields a command, nothing, or an error.
        let _ = Command::parse(&line);
    }

    #[test]
    fn prop_ack_accepts_exactly_four_kinds(kind in "[a-z]{1,8}") {
        let parsed = Command::parse(&format!("/ack m1 {kind}"));
        let known = matches!(kind.as_str(), "request" | "accept" | "decline" | "close");

        // PROPERTY: only the four notification kinds parse.
        prop_assert_eq!(parsed.is_ok(), known);
    }
}
