use std::ops::Range;

/// Byte range of a token or form in a notation file.
///
/// Notation sources are always a single file, so a span carries offsets only.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// From the start of `self` to the end of `last`.
    pub fn to(self, last: Span) -> Span {
        Span::new(self.start.min(last.start), self.end.max(last.end))
    }

    pub fn range(self) -> Range<usize> {
        self.start as usize..self.end as usize
    }
}

#[derive(Clone, Debug)]
pub struct Spanned<T> {
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(node: T, span: Span) -> Self {
        Self { node, span }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_covers_both_ends() {
        let open = Span::new(4, 9);
        assert_eq!(open.to(Span::new(2, 6)), Span::new(2, 9));
        assert_eq!(Span::new(3, 7).range(), 3..7);
        assert_eq!(Span::default().range(), 0..0);
    }
}
