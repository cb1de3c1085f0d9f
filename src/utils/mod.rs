use pulldown_cmark::{html, Options, Parser};
use std::path::PathBuf;

pub fn default_database_path() -> PathBuf {
    let mut path = PathBuf::from("./data");
    path.push("practice_tracker.db");
    path
}

/// Markdown 转 HTML（题目描述、题解）
pub fn render_markdown(content: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_TASKLISTS);

    let parser = Parser::new_ext(content, options);
    let mut html_output = String::new();
    html::push_html(&mut html_output, parser);

    html_output
}
