//! Splitting batch text into sink-sized messages

/// Split `text` into ordered chunks of at most `limit` characters.
///
/// Whole lines are packed together while they fit, blank lines included, so
/// joining the chunks with `\n` gives back `text` when no line exceeds
/// `limit`. A longer line is cut on character boundaries.
pub fn split_chunks(text: &str, limit: usize) -> Vec<String> {
    if text.is_empty() || limit == 0 {
        return vec![];
    }
    if text.chars().count() <= limit {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current: Option<String> = None;
    let mut current_len = 0;

    for line in text.split('\n') {
        let line_len = line.chars().count();

        if line_len > limit {
            chunks.extend(current.take());
            let chars: Vec<char> = line.chars().collect();
            chunks.extend(chars.chunks(limit).map(|piece| piece.iter().collect::<String>()));
            continue;
        }

        match current.as_mut() {
            Some(chunk) if current_len + 1 + line_len <= limit => {
                chunk.push('\n');
                chunk.push_str(line);
                current_len += 1 + line_len;
            }
            _ => {
                chunks.extend(current.replace(line.to_string()));
                current_len = line_len;
            }
        }
    }

    chunks.extend(current);
    chunks
}
