use tldr_pages::prompt::{
    MAX_CONTENT_CHARS, MAX_TITLE_CHARS, build_summary_prompt, estimate_tokens, sanitize_page_text,
};

#[test]
fn test_sanitize_page_text_strips_control_chars() {
    let input = "Summary with \u{007F} control \u{0000} chars\nand\ttabs";
    let expected = "Summary with  control  chars\nand\ttabs";
    assert_eq!(sanitize_page_text(input, 1_000), expected);
}

#[test]
fn test_sanitize_page_text_truncates_by_chars() {
    let long_input = "é".repeat(MAX_CONTENT_CHARS + 100);
    let result = sanitize_page_text(&long_input, MAX_CONTENT_CHARS);
    assert_eq!(result.chars().count(), MAX_CONTENT_CHARS);
}

#[test]
fn test_build_summary_prompt_includes_title_and_content() {
    let prompt = build_summary_prompt("Example Domain", "Body text").unwrap();
    assert!(prompt.contains("Title: Example Domain"));
    assert!(prompt.contains("Body text"));
}

#[test]
fn test_build_summary_prompt_untitled_and_empty() {
    let prompt = build_summary_prompt("", "Only content").unwrap();
    assert!(prompt.contains("(untitled)"));

    assert_eq!(build_summary_prompt("  ", "\n"), None);
}

#[test]
fn test_build_summary_prompt_bounds_title() {
    let prompt = build_summary_prompt(&"t".repeat(MAX_TITLE_CHARS * 2), "c").unwrap();
    assert!(!prompt.contains(&"t".repeat(MAX_TITLE_CHARS + 1)));
}

#[test]
fn test_estimate_tokens() {
    assert_eq!(estimate_tokens(""), 1);
    assert_eq!(estimate_tokens("abcdefgh"), 3);
}
