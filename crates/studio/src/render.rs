//! Plain-text transcript rendering for the terminal.

use std::io::Write;

use anyhow::Result;
use studio_core::Run;
use studio_settings::Language;
use studio_ui::{AvatarCatalog, AvatarView, BubbleView, Segment, translate};

/// Write a run header followed by one block per bubble.
pub(crate) fn transcript(
    out: &mut impl Write,
    run: &Run,
    bubbles: &[BubbleView],
    avatars: &AvatarCatalog,
    language: Language,
) -> Result<()> {
    writeln!(
        out,
        "{} / {} [{}] started {}",
        run.project,
        run.name,
        run.status.as_sql(),
        run.timestamp
    )?;
    if bubbles.is_empty() {
        writeln!(out, "\n{}", translate(language, "chat.empty"))?;
    }
    for bubble in bubbles {
        writeln!(out)?;
        let marker = if bubble.is_user() { ">" } else { "<" };
        writeln!(
            out,
            "{marker} [{}] {} ({}) {}",
            avatar_label(&avatars.view_in_place(&bubble.avatar, None)),
            bubble.name,
            bubble.role,
            bubble.timestamp
        )?;
        for segment in &bubble.segments {
            write_segment(out, segment, language)?;
        }
    }
    Ok(())
}

fn write_segment(out: &mut impl Write, segment: &Segment, language: Language) -> Result<()> {
    match segment {
        Segment::Markdown(text) | Segment::Text(text) => {
            for line in text.lines() {
                writeln!(out, "  {line}")?;
            }
        }
        Segment::Thinking(text) => writeln!(
            out,
            "  ({}) {}",
            translate(language, "chat.thinking"),
            first_line(text)
        )?,
        Segment::Image(src) => writeln!(out, "  [image] {src}")?,
        Segment::Audio(src) => writeln!(out, "  [audio] {src}")?,
        Segment::Video(src) => writeln!(out, "  [video] {src}")?,
        Segment::ToolCall {
            name, input, output, ..
        } => {
            writeln!(
                out,
                "  [{}] {name} {}",
                translate(language, "chat.tool"),
                first_line(input)
            )?;
            if let Some(output) = output {
                writeln!(out, "    -> {}", first_line(output))?;
            }
        }
    }
    Ok(())
}

fn avatar_label(view: &AvatarView) -> String {
    match view {
        AvatarView::Custom(label) | AvatarView::Initials(label) => label.clone(),
        AvatarView::System => "system".to_string(),
        AvatarView::Image { src } => std::path::Path::new(src)
            .file_name()
            .map_or_else(|| src.clone(), |name| name.to_string_lossy().into_owned()),
    }
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use studio_core::RunStatus;
    use studio_ui::AvatarKey;

    fn run() -> Run {
        Run {
            id: "r".into(),
            project: "demo".into(),
            name: "first".into(),
            timestamp: "2025-01-01 09:00:00.000".into(),
            run_dir: "/tmp".into(),
            pid: 1,
            status: RunStatus::Done,
        }
    }

    fn render(bubbles: &[BubbleView], language: Language) -> String {
        let mut buf = Vec::new();
        transcript(&mut buf, &run(), bubbles, &AvatarCatalog::default(), language).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn avatar_labels() {
        assert_eq!(avatar_label(&AvatarView::System), "system");
        assert_eq!(avatar_label(&AvatarView::Initials("FR".into())), "FR");
        assert_eq!(
            avatar_label(&AvatarView::Image {
                src: "/avatars/fox.png".into()
            }),
            "fox.png"
        );
    }

    #[test]
    fn empty_transcript_is_translated() {
        assert!(render(&[], Language::En).contains("No messages yet"));
        assert!(render(&[], Language::Zh).contains("暂无消息"));
    }

    #[test]
    fn segments_render_one_line_each() {
        let bubble = BubbleView {
            key: "m".into(),
            name: "me".into(),
            role: "user".into(),
            timestamp: "t".into(),
            avatar: AvatarKey::new("me", "user", false, 0),
            segments: vec![
                Segment::Text("line one\nline two".into()),
                Segment::ToolCall {
                    id: "c".into(),
                    name: "search".into(),
                    input: "{".into(),
                    output: Some("done".into()),
                },
            ],
        };
        let text = render(&[bubble], Language::En);
        assert!(text.contains("> [ME] me (user) t"));
        assert!(text.contains("  line two"));
        assert!(text.contains("[tool] search {"));
        assert!(text.contains("    -> done"));
    }
}
