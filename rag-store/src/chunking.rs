//! Page-aware overlapping character windows.

use tracing::debug;

/// A chunk before it is embedded and assigned an id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChunkDraft {
    pub page_start: u32,
    pub page_end: u32,
    pub text: String,
}

/// Splits `(page, text)` pairs into windows of `chunk_size` characters.
///
/// Text from different pages is separated by `\n`. After each emitted chunk
/// its last `chunk_overlap` characters seed the next one, each carried piece
/// keeping the page it came from. A trailing window made only of carried
/// overlap is not emitted.
///
/// Lengths are counted in chars, never bytes; page separators do not count.
pub fn split_into_chunks(
    pages: &[(u32, String)],
    chunk_size: usize,
    chunk_overlap: usize,
) -> Vec<ChunkDraft> {
    let mut w = Window {
        chunk_size: chunk_size.max(1),
        chunk_overlap: chunk_overlap.min(chunk_size.saturating_sub(1)),
        buf: Vec::new(),
        len: 0,
        fresh: false,
        out: Vec::new(),
    };

    for (page, text) in pages {
        let mut rest = text.as_str();
        while !rest.is_empty() {
            let room = w.chunk_size - w.len;
            let cut = rest
                .char_indices()
                .nth(room)
                .map(|(i, _)| i)
                .unwrap_or(rest.len());
            let (take, tail) = rest.split_at(cut);
            w.len += take.chars().count();
            w.buf.push((*page, take.to_string()));
            w.fresh = true;
            rest = tail;
            if w.len >= w.chunk_size {
                w.flush();
            }
        }
    }
    if w.fresh {
        w.flush();
    }

    debug!(pages = pages.len(), chunks = w.out.len(), "split pages");
    w.out
}

struct Window {
    chunk_size: usize,
    chunk_overlap: usize,
    buf: Vec<(u32, String)>,
    len: usize,
    fresh: bool,
    out: Vec<ChunkDraft>,
}

impl Window {
    fn flush(&mut self) {
        let (Some(first), Some(last)) = (self.buf.first(), self.buf.last()) else {
            return;
        };
        let (page_start, page_end) = (first.0, last.0);
        let mut text = String::new();
        let mut prev_page = page_start;
        for (page, piece) in &self.buf {
            if *page != prev_page {
                text.push('\n');
                prev_page = *page;
            }
            text.push_str(piece);
        }

        let carry = self.carry();
        self.len = carry.iter().map(|(_, t)| t.chars().count()).sum();
        self.buf = carry;
        self.fresh = false;

        self.out.push(ChunkDraft {
            page_start,
            page_end,
            text,
        });
    }

    /// Last `chunk_overlap` chars of the window, split back into page pieces.
    fn carry(&self) -> Vec<(u32, String)> {
        let content: usize = self.buf.iter().map(|(_, t)| t.chars().count()).sum();
        if self.chunk_overlap == 0 || content <= self.chunk_overlap {
            return Vec::new();
        }
        let mut need = self.chunk_overlap;
        let mut out = Vec::new();
        for (page, piece) in self.buf.iter().rev() {
            if need == 0 {
                break;
            }
            let n = piece.chars().count();
            let keep = n.min(need);
            out.push((*page, piece.chars().skip(n - keep).collect()));
            need -= keep;
        }
        out.reverse();
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pages(v: &[(u32, &str)]) -> Vec<(u32, String)> {
        v.iter().map(|(p, t)| (*p, t.to_string())).collect()
    }

    #[test]
    fn short_document_is_one_chunk() {
        let out = split_into_chunks(&pages(&[(1, "hello"), (2, "world")]), 100, 10);
        assert_eq!(
            out,
            vec![ChunkDraft {
                page_start: 1,
                page_end: 2,
                text: "hello\nworld".into()
            }]
        );
    }

    #[test]
    fn windows_overlap_and_track_pages() {
        let out = split_into_chunks(&pages(&[(1, "abcdefgh"), (2, "ijklmnop")]), 6, 2);
        assert_eq!(out[0].text, "abcdef");
        assert_eq!((out[0].page_start, out[0].page_end), (1, 1));
        // second window starts with the carried "ef"
        assert!(out[1].text.starts_with("ef"));
        assert!(out.iter().any(|c| c.page_start == 1 && c.page_end == 2));
        assert_eq!(out.last().map(|c| c.page_end), Some(2));
        for c in &out {
            assert!(c.page_start <= c.page_end);
        }
    }

    #[test]
    fn overlap_across_a_page_break_keeps_the_earlier_page() {
        let out = split_into_chunks(&pages(&[(1, "abcd"), (2, "efgh")]), 6, 3);
        assert_eq!(out[0].text, "abcd\nef");
        assert_eq!(out[1].text, "d\nefgh");
        assert_eq!((out[1].page_start, out[1].page_end), (1, 2));
    }

    #[test]
    fn no_trailing_overlap_only_chunk() {
        let out = split_into_chunks(&pages(&[(1, "abcdef")]), 3, 1);
        // "abc", "cde", "ef": never a lone "f"
        assert_eq!(
            out.iter().map(|c| c.text.as_str()).collect::<Vec<_>>(),
            vec!["abc", "cde", "ef"]
        );
    }

    #[test]
    fn counts_chars_not_bytes() {
        let out = split_into_chunks(&pages(&[(1, "ééééé")]), 2, 0);
        assert_eq!(
            out.iter().map(|c| c.text.as_str()).collect::<Vec<_>>(),
            vec!["éé", "éé", "é"]
        );
    }

    #[test]
    fn empty_input_yields_nothing() {
        assert!(split_into_chunks(&[], 10, 2).is_empty());
    }
}
