//! Markdown helpers for splicing model-written text into the report.

/// Heading level of a line, if it is an ATX heading (`#` to `######` then a space)
fn heading_level(line: &str) -> Option<usize> {
    let trimmed = line.trim_start();
    let level = trimmed.chars().take_while(|c| *c == '#').count();
    if (1..=6).contains(&level) && trimmed[level..].starts_with(' ') {
        Some(level)
    } else {
        None
    }
}

fn is_fence(line: &str) -> bool {
    line.trim_start().starts_with("```")
}

/// Lowercased heading text with numbering, emphasis and a trailing colon removed
fn normalize_heading(text: &str) -> String {
    let text = text.trim().trim_matches('*').trim();
    let text = text
        .trim_start_matches(|c: char| c.is_ascii_digit())
        .trim_start_matches(['.', ')'])
        .trim();
    text.trim_end_matches(':').trim().to_lowercase()
}

/// Body of the first heading titled `title`, up to the next heading of the same
/// or a shallower level. Returns None when the heading is absent or its body is empty.
pub fn extract_section(markdown: &str, title: &str) -> Option<String> {
    let wanted = normalize_heading(title);
    let mut in_fence = false;
    let mut found: Option<usize> = None;
    let mut body = Vec::new();

    for line in markdown.lines() {
        if is_fence(line) {
            in_fence = !in_fence;
        }
        let level = if in_fence || is_fence(line) { None } else { heading_level(line) };

        match (found, level) {
            (None, Some(level)) => {
                let text = &line.trim_start()[level..];
                if normalize_heading(text) == wanted {
                    found = Some(level);
                }
            }
            (Some(current), Some(level)) if level <= current => break,
            (Some(_), _) => body.push(line),
            (None, None) => {}
        }
    }

    found?;
    let body = body.join("\n").trim().to_string();
    if body.is_empty() { None } else { Some(body) }
}

/// Shift every heading down so the shallowest one sits at `min_level`.
/// Headings inside code fences are left alone; levels never exceed six.
pub fn demote_headings(markdown: &str, min_level: usize) -> String {
    let mut in_fence = false;
    let mut shallowest = None;
    for line in markdown.lines() {
        if is_fence(line) {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            continue;
        }
        if let Some(level) = heading_level(line) {
            shallowest = Some(shallowest.map_or(level, |s: usize| s.min(level)));
        }
    }

    let shift = match shallowest {
        Some(level) if level < min_level => min_level - level,
        _ => return markdown.to_string(),
    };

    in_fence = false;
    markdown
        .lines()
        .map(|line| {
            if is_fence(line) {
                in_fence = !in_fence;
                return line.to_string();
            }
            match heading_level(line) {
                Some(level) if !in_fence => {
                    let text = line.trim_start()[level..].trim_start();
                    format!("{} {}", "#".repeat((level + shift).min(6)), text)
                }
                _ => line.to_string(),
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Close a code fence left open by a cut-off reply so it cannot swallow
/// the headings that follow it.
pub fn close_open_fence(markdown: &str) -> String {
    let fences = markdown.lines().filter(|line| is_fence(line)).count();
    if fences % 2 == 1 {
        format!("{}\n```", markdown.trim_end())
    } else {
        markdown.to_string()
    }
}

/// Collapse whitespace runs (including newlines) into single spaces
pub fn inline(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Make text safe for a single table cell
pub fn escape_cell(text: &str) -> String {
    let cell = inline(text).replace('|', "\\|");
    if cell.is_empty() { "-".to_string() } else { cell }
}
