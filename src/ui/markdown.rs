//! Markdown-styled rendering of the streamed response.
//!
//! A deliberately small subset: headings, paragraphs, emphasis, inline and
//! fenced code, lists, and rules. The renderer is re-run over the full
//! accumulated response on every redraw, so it has to tolerate markdown
//! that is cut off mid-construct while the stream is still going.

use pulldown_cmark::{Event, Parser, Tag, TagEnd};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

pub fn render_markdown(text: &str) -> Vec<Line<'static>> {
    Renderer::default().run(Parser::new(text))
}

fn heading_style() -> Style {
    Style::default().add_modifier(Modifier::BOLD)
}

fn code_style() -> Style {
    Style::default().fg(Color::Yellow)
}

#[derive(Default)]
struct Renderer {
    lines: Vec<Line<'static>>,
    spans: Vec<Span<'static>>,
    styles: Vec<Style>,
    list_stack: Vec<Option<u64>>,
    in_code_block: bool,
}

impl Renderer {
    fn run(mut self, parser: Parser) -> Vec<Line<'static>> {
        for event in parser {
            match event {
                Event::Start(tag) => self.start_tag(tag),
                Event::End(tag) => self.end_tag(tag),
                Event::Text(text) => self.text(&text),
                Event::Code(code) => self
                    .spans
                    .push(Span::styled(code.to_string(), code_style())),
                Event::SoftBreak | Event::HardBreak => self.flush_line(),
                Event::Rule => {
                    self.flush_line();
                    self.lines.push(Line::from("───"));
                }
                _ => {}
            }
        }
        self.flush_line();
        while self
            .lines
            .last()
            .is_some_and(|line| line.spans.is_empty())
        {
            self.lines.pop();
        }
        self.lines
    }

    fn start_tag(&mut self, tag: Tag) {
        match tag {
            Tag::Paragraph => self.flush_line(),
            Tag::Heading { .. } => {
                self.flush_line();
                self.styles.push(heading_style());
            }
            Tag::CodeBlock(_) => {
                self.flush_line();
                self.in_code_block = true;
            }
            Tag::List(start) => self.list_stack.push(start),
            Tag::Item => {
                self.flush_line();
                let bullet = match self.list_stack.last_mut() {
                    Some(Some(number)) => {
                        let bullet = format!("{number}. ");
                        *number += 1;
                        bullet
                    }
                    _ => "• ".to_string(),
                };
                self.spans.push(Span::raw(bullet));
            }
            Tag::Emphasis => self
                .styles
                .push(self.current_style().add_modifier(Modifier::ITALIC)),
            Tag::Strong => self
                .styles
                .push(self.current_style().add_modifier(Modifier::BOLD)),
            _ => {}
        }
    }

    fn end_tag(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => self.blank_line(),
            TagEnd::Heading(_) => {
                self.styles.pop();
                self.blank_line();
            }
            TagEnd::CodeBlock => {
                self.in_code_block = false;
                self.blank_line();
            }
            TagEnd::List(_) => {
                self.list_stack.pop();
                if self.list_stack.is_empty() {
                    self.blank_line();
                }
            }
            TagEnd::Item => self.flush_line(),
            TagEnd::Emphasis | TagEnd::Strong => {
                self.styles.pop();
            }
            _ => {}
        }
    }

    fn text(&mut self, text: &str) {
        if self.in_code_block {
            let mut first = true;
            for part in text.split('\n') {
                if !first {
                    self.flush_line();
                }
                first = false;
                if !part.is_empty() {
                    self.spans.push(Span::styled(part.to_string(), code_style()));
                }
            }
        } else {
            self.spans
                .push(Span::styled(text.to_string(), self.current_style()));
        }
    }

    fn current_style(&self) -> Style {
        self.styles.last().copied().unwrap_or_default()
    }

    fn flush_line(&mut self) {
        if !self.spans.is_empty() {
            self.lines.push(Line::from(std::mem::take(&mut self.spans)));
        }
    }

    fn blank_line(&mut self) {
        self.flush_line();
        if self.lines.last().is_some_and(|line| !line.spans.is_empty()) {
            self.lines.push(Line::default());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(lines: &[Line]) -> Vec<String> {
        lines
            .iter()
            .map(|line| {
                line.spans
                    .iter()
                    .map(|span| span.content.as_ref())
                    .collect::<String>()
            })
            .collect()
    }

    #[test]
    fn plain_text_is_one_line() {
        let lines = render_markdown("hello world");
        assert_eq!(plain(&lines), vec!["hello world"]);
    }

    #[test]
    fn headings_are_bold() {
        let lines = render_markdown("# Title\n\nbody");
        assert_eq!(plain(&lines), vec!["Title", "", "body"]);
        assert!(lines[0].spans[0]
            .style
            .add_modifier
            .contains(Modifier::BOLD));
    }

    #[test]
    fn fenced_code_is_styled_per_line() {
        let lines = render_markdown("```\nlet x = 1;\nlet y = 2;\n```");
        assert_eq!(plain(&lines), vec!["let x = 1;", "let y = 2;"]);
        assert_eq!(lines[0].spans[0].style.fg, Some(Color::Yellow));
    }

    #[test]
    fn inline_code_keeps_surrounding_text() {
        let lines = render_markdown("use `foo` here");
        assert_eq!(plain(&lines), vec!["use foo here"]);
        assert_eq!(lines[0].spans[1].style.fg, Some(Color::Yellow));
    }

    #[test]
    fn lists_get_bullets_and_numbers() {
        let lines = render_markdown("- one\n- two\n\n1. first\n2. second");
        assert_eq!(
            plain(&lines),
            vec!["• one", "• two", "", "1. first", "2. second"]
        );
    }

    #[test]
    fn incomplete_markdown_still_renders() {
        // Mid-stream the response can end inside a construct; unmatched
        // markers fall back to literal text.
        let lines = render_markdown("some **bol");
        assert_eq!(plain(&lines), vec!["some **bol"]);
    }
}
