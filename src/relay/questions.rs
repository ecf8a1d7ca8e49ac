// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Predefined pre-support questions.

/// Question table, ids 1..=5.
pub const QUESTIONS: &[(u32, &str)] = &[
    (1, "What specific technical issue are you experiencing with the platform?"),
    (2, "Could you please provide your order ID or transaction reference?"),
    (3, "Which operating system or device are you currently using?"),
    (4, "Is this your first time encountering this problem, or has it happened before?"),
    (5, "What steps have you already taken to try and resolve the issue?"),
];

pub fn lookup(id: u32) -> Option<&'static str> {
    QUESTIONS
        .iter()
        .find(|(question_id, _)| *question_id == id)
        .map(|(_, text)| *text)
}

/// Operator-facing listing of the table.
pub fn render_list() -> String {
    let mut out = String::from("**Available Questions:**\n");
    for (id, text) in QUESTIONS {
        out.push_str(&format!("**{id}**: {text}\n"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_known_and_unknown_ids() {
        assert!(lookup(1).unwrap().starts_with("What specific technical issue"));
        assert!(lookup(5).is_some());
        assert!(lookup(0).is_none());
        assert!(lookup(6).is_none());
    }

    #[test]
    fn list_contains_every_question() {
        let list = render_list();
        assert!(list.starts_with("**Available Questions:**\n"));
        for (id, text) in QUESTIONS {
            assert!(list.contains(&format!("**{id}**: {text}")));
        }
    }
}
