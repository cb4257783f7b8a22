use pulldown_cmark::{html, Event, Options, Parser, TagEnd};

/// Characters of rendered text kept in a generated excerpt.
pub const EXCERPT_CHARS: usize = 150;
/// Upper bound for an excerpt supplied by the author.
pub const EXCERPT_MAX_CHARS: usize = 300;

fn markdown_options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);
    options
}

/// Render a post body to HTML.
pub fn render_markdown(markdown: &str) -> String {
    let parser = Parser::new_ext(markdown, markdown_options());
    let mut html_output = String::new();
    html::push_html(&mut html_output, parser);
    html_output
}

/// The visible text of a rendered markdown document, whitespace collapsed.
pub fn markdown_plain_text(markdown: &str) -> String {
    let mut raw = String::new();
    for event in Parser::new_ext(markdown, markdown_options()) {
        match event {
            Event::Text(text) | Event::Code(text) => raw.push_str(&text),
            Event::SoftBreak | Event::HardBreak | Event::Rule => raw.push(' '),
            Event::End(TagEnd::Paragraph | TagEnd::Heading(_) | TagEnd::Item) => raw.push(' '),
            Event::End(TagEnd::TableCell | TagEnd::CodeBlock) => raw.push(' '),
            _ => {}
        }
    }
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Excerpt generated from a markdown body: the first [`EXCERPT_CHARS`]
/// characters of its text, with `...` appended when the text was longer.
pub fn excerpt_from_body(markdown: &str) -> String {
    let plain = markdown_plain_text(markdown);
    if plain.chars().count() > EXCERPT_CHARS {
        let mut cut: String = plain.chars().take(EXCERPT_CHARS).collect();
        cut.push_str("...");
        cut
    } else {
        plain
    }
}
