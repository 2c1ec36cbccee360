//! Note file codec: a YAML frontmatter block fenced by `---` lines, followed by the body.

use serde::{Deserialize, Serialize};

use crate::{
    error::ArborError,
    note::{default_title, generate_id, now_millis, CustomProps, Note},
};

const FENCE: &str = "---";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct NoteFrontmatter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    desc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    created: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    updated: Option<i64>,
    #[serde(flatten)]
    custom: CustomProps,
}

/// Split `content` into (frontmatter, body). Content without an opening fence has no
/// frontmatter; an opening fence without a closing one is an error.
fn split_frontmatter(content: &str) -> Result<(Option<&str>, &str), String> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let mut lines = content.split_inclusive('\n');
    match lines.next() {
        Some(first) if first.trim_end() == FENCE => {}
        _ => return Ok((None, content)),
    }
    let yaml_start = content.find('\n').map(|idx| idx + 1).unwrap_or(content.len());
    let mut offset = yaml_start;
    for line in lines {
        if line.trim_end() == FENCE {
            return Ok((
                Some(&content[yaml_start..offset]),
                &content[offset + line.len()..],
            ));
        }
        offset += line.len();
    }
    Err("frontmatter is missing its closing '---'".to_string())
}

/// Parse a note file. Frontmatter problems surface as [ArborError::BadParseForNote].
pub fn parse_note(fname: &str, path: &str, content: &str) -> Result<Note, ArborError> {
    let bad_parse = |reason: String| ArborError::BadParseForNote {
        path: path.to_string(),
        reason,
    };
    let (yaml, body) = split_frontmatter(content).map_err(bad_parse)?;
    let frontmatter = match yaml {
        Some(yaml) if !yaml.trim().is_empty() => {
            serde_yaml::from_str::<NoteFrontmatter>(yaml).map_err(|e| bad_parse(e.to_string()))?
        }
        _ => NoteFrontmatter::default(),
    };

    let now = now_millis();
    let created = frontmatter.created.unwrap_or(now);
    Ok(Note {
        id: frontmatter.id.unwrap_or_else(generate_id),
        title: frontmatter.title.unwrap_or_else(|| default_title(fname)),
        fname: fname.to_string(),
        desc: frontmatter.desc.unwrap_or_default(),
        created,
        updated: frontmatter.updated.unwrap_or(created),
        parent: None,
        children: Vec::new(),
        stub: false,
        custom: frontmatter.custom,
        body: body.to_string(),
    })
}

/// Render a note back into its file form.
pub fn render_note(note: &Note) -> Result<String, ArborError> {
    let frontmatter = NoteFrontmatter {
        id: Some(note.id.clone()),
        title: Some(note.title.clone()),
        desc: Some(note.desc.clone()),
        created: Some(note.created),
        updated: Some(note.updated),
        custom: note.custom.clone(),
    };
    let yaml = serde_yaml::to_string(&frontmatter)?;
    Ok(format!("{FENCE}\n{yaml}{FENCE}\n{}", note.body))
}
