//! Tests for briefing prompt templates under config/prompts

use std::fs;

const BRIEFS: [&str; 3] = ["news_brief.txt", "papers_brief.txt", "trends_brief.txt"];

fn read(name: &str) -> String {
    fs::read_to_string(format!("config/prompts/{name}"))
        .unwrap_or_else(|e| panic!("{name} prompt file missing: {e}"))
}

#[test]
fn test_brief_prompt_files_exist() {
    for name in BRIEFS {
        assert!(fs::metadata(format!("config/prompts/{name}")).is_ok(), "{name} prompt file missing");
    }
}

#[test]
fn test_brief_prompt_template_vars() {
    for name in BRIEFS {
        let text = read(name);
        assert!(text.contains("{{context}}"), "{name} should contain {{{{context}}}} variable");
        assert!(!text.contains("{{query}}"), "{name} runs a fixed query and should not use {{{{query}}}}");
    }
}

#[test]
fn test_search_prompt_template_vars() {
    let text = read("general_search.txt");
    assert!(text.contains("{{query}}"), "general_search.txt should contain {{query}} variable");
    assert!(text.contains("{{context}}"), "general_search.txt should contain {{context}} variable");
}
