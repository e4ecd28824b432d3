// This file is part of nestfmt.
// Copyright (C) 2025 Midnight Foundation
// SPDX-License-Identifier: Apache-2.0

//! Translation between an embedded region and the document it lives in.
//!
//! A [`RangeMapper`] holds an unordered set of [`Mapping`]s, each pairing a
//! byte range in the outer ("source") document with a byte range in the
//! region's own ("generated") document. [`DocumentMap`] lifts the offset API
//! to LSP positions by pairing the mapper with both documents.

use std::ops::Range as OffsetRange;

use lsp_types::{Position, Range};

use crate::document::TextDocument;

/// One (source range, generated range) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mapping {
    pub source: OffsetRange<usize>,
    pub generated: OffsetRange<usize>,
}

impl Mapping {
    pub fn new(source: OffsetRange<usize>, generated: OffsetRange<usize>) -> Self {
        Self { source, generated }
    }

    /// A mapping where both sides cover the same offsets.
    pub fn identity(range: OffsetRange<usize>) -> Self {
        Self {
            source: range.clone(),
            generated: range,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    ToGenerated,
    ToSource,
}

impl Direction {
    fn sides(self, mapping: &Mapping) -> (&OffsetRange<usize>, &OffsetRange<usize>) {
        match self {
            Direction::ToGenerated => (&mapping.source, &mapping.generated),
            Direction::ToSource => (&mapping.generated, &mapping.source),
        }
    }
}

/// Bidirectional offset translation over one mapping set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RangeMapper {
    mappings: Vec<Mapping>,
}

impl RangeMapper {
    pub fn new(mappings: Vec<Mapping>) -> Self {
        Self { mappings }
    }

    pub fn mappings(&self) -> &[Mapping] {
        &self.mappings
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    pub fn to_generated_offset(&self, offset: usize) -> Option<usize> {
        self.translate_offset(offset, Direction::ToGenerated)
    }

    pub fn to_source_offset(&self, offset: usize) -> Option<usize> {
        self.translate_offset(offset, Direction::ToSource)
    }

    pub fn to_generated_range(&self, range: OffsetRange<usize>) -> Option<OffsetRange<usize>> {
        self.translate_range(range, Direction::ToGenerated)
    }

    pub fn to_source_range(&self, range: OffsetRange<usize>) -> Option<OffsetRange<usize>> {
        self.translate_range(range, Direction::ToSource)
    }

    /// The mapping with the smallest source start.
    pub fn first_mapping(&self) -> Option<&Mapping> {
        self.mappings.iter().min_by_key(|m| m.source.start)
    }

    /// The mapping with the largest source start.
    pub fn last_mapping(&self) -> Option<&Mapping> {
        self.mappings.iter().max_by_key(|m| m.source.start)
    }

    /// Fallback for whole-document requests.
    ///
    /// When `range` starts before the first mapping and ends after the last
    /// one, it encloses every mapped byte (plus unmapped text at the edges),
    /// and the generated side collapses to `first.generated.start ..
    /// last.generated.end`.
    pub fn enclosing_generated_range(
        &self,
        range: OffsetRange<usize>,
    ) -> Option<OffsetRange<usize>> {
        let first = self.first_mapping()?;
        let last = self.last_mapping()?;
        if range.start < first.source.start && range.end > last.source.end {
            Some(first.generated.start..last.generated.end)
        } else {
            None
        }
    }

    fn translate_offset(&self, offset: usize, direction: Direction) -> Option<usize> {
        self.mappings.iter().find_map(|mapping| {
            let (from, to) = direction.sides(mapping);
            covers(from, offset).then(|| shift(offset, from, to))
        })
    }

    fn translate_range(
        &self,
        range: OffsetRange<usize>,
        direction: Direction,
    ) -> Option<OffsetRange<usize>> {
        let within_one = self.mappings.iter().find_map(|mapping| {
            let (from, to) = direction.sides(mapping);
            (covers(from, range.start) && covers(from, range.end))
                .then(|| shift(range.start, from, to)..shift(range.end, from, to))
        });
        if within_one.is_some() {
            return within_one;
        }

        let start = self.translate_offset(range.start, direction)?;
        let end = self.translate_offset(range.end, direction)?;
        (start <= end).then_some(start..end)
    }
}

/// Inclusive on both ends: an offset at the end of a mapping still maps.
fn covers(range: &OffsetRange<usize>, offset: usize) -> bool {
    range.start <= offset && offset <= range.end
}

fn shift(offset: usize, from: &OffsetRange<usize>, to: &OffsetRange<usize>) -> usize {
    let delta = (offset - from.start).min(to.end.saturating_sub(to.start));
    to.start + delta
}

/// A [`RangeMapper`] bound to its two documents, speaking LSP positions.
#[derive(Debug, Clone, Copy)]
pub struct DocumentMap<'a> {
    pub source: &'a TextDocument,
    pub generated: &'a TextDocument,
    pub mapper: &'a RangeMapper,
}

impl<'a> DocumentMap<'a> {
    pub fn new(
        source: &'a TextDocument,
        generated: &'a TextDocument,
        mapper: &'a RangeMapper,
    ) -> Self {
        Self {
            source,
            generated,
            mapper,
        }
    }

    pub fn to_generated_position(&self, position: Position) -> Option<Position> {
        let offset = self
            .mapper
            .to_generated_offset(self.source.offset_at(position))?;
        Some(self.generated.position_at(offset))
    }

    pub fn to_source_position(&self, position: Position) -> Option<Position> {
        let offset = self
            .mapper
            .to_source_offset(self.generated.offset_at(position))?;
        Some(self.source.position_at(offset))
    }

    pub fn to_generated_range(&self, range: Range) -> Option<Range> {
        let offsets = self
            .mapper
            .to_generated_range(self.source.to_offsets(range))?;
        Some(self.generated.to_range(offsets))
    }

    pub fn to_source_range(&self, range: Range) -> Option<Range> {
        let offsets = self
            .mapper
            .to_source_range(self.generated.to_offsets(range))?;
        Some(self.source.to_range(offsets))
    }

    pub fn enclosing_generated_range(&self, range: Range) -> Option<Range> {
        let offsets = self
            .mapper
            .enclosing_generated_range(self.source.to_offsets(range))?;
        Some(self.generated.to_range(offsets))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapper() -> RangeMapper {
        // Listed out of order on purpose: mapping sets are unordered.
        RangeMapper::new(vec![
            Mapping::new(20..30, 12..22),
            Mapping::new(5..10, 0..5),
            Mapping::new(10..12, 5..7),
        ])
    }

    #[test]
    fn test_offset_translation() {
        let m = mapper();
        assert_eq!(m.to_generated_offset(7), Some(2));
        assert_eq!(m.to_generated_offset(25), Some(17));
        assert_eq!(m.to_generated_offset(15), None);
        assert_eq!(m.to_source_offset(17), Some(25));
        assert_eq!(m.to_source_offset(9), None);
    }

    #[test]
    fn test_range_translation_requires_both_endpoints() {
        let m = mapper();
        assert_eq!(m.to_generated_range(6..9), Some(1..4));
        assert_eq!(m.to_generated_range(6..11), Some(1..6));
        assert_eq!(m.to_generated_range(6..15), None);
        assert_eq!(m.to_source_range(13..22), Some(21..30));
        assert_eq!(m.to_source_range(0..30), None);
    }

    #[test]
    fn test_round_trip_every_mapping() {
        let m = mapper();
        for mapping in m.mappings() {
            let generated = m.to_generated_range(mapping.source.clone()).unwrap();
            assert_eq!(m.to_source_range(generated), Some(mapping.source.clone()));
        }
    }

    #[test]
    fn test_unequal_lengths_clamp() {
        let m = RangeMapper::new(vec![Mapping::new(0..10, 100..104)]);
        assert_eq!(m.to_generated_offset(2), Some(102));
        assert_eq!(m.to_generated_offset(8), Some(104));
    }

    #[test]
    fn test_extremities() {
        let m = mapper();
        assert_eq!(m.first_mapping().unwrap().source, 5..10);
        assert_eq!(m.last_mapping().unwrap().source, 20..30);
        assert!(RangeMapper::default().first_mapping().is_none());
    }

    #[test]
    fn test_enclosing_generated_range() {
        let m = mapper();
        assert_eq!(m.enclosing_generated_range(0..40), Some(0..22));
        // Must start strictly before the first and end strictly after the last.
        assert_eq!(m.enclosing_generated_range(5..40), None);
        assert_eq!(m.enclosing_generated_range(0..30), None);
        assert_eq!(RangeMapper::default().enclosing_generated_range(0..40), None);
    }

    #[test]
    fn test_document_map_positions() {
        let source = TextDocument::new("file:///a.html", "html", 1, "<p>\n  <b>x</b>\n</p>");
        let generated = TextDocument::new("embedded", "text", 1, "  <b>x</b>");
        // Source bytes 4..14 are the second line.
        let mapper = RangeMapper::new(vec![Mapping::new(4..14, 0..10)]);
        let map = DocumentMap::new(&source, &generated, &mapper);

        assert_eq!(
            map.to_generated_position(Position::new(1, 5)),
            Some(Position::new(0, 5))
        );
        assert_eq!(map.to_generated_position(Position::new(0, 1)), None);
        assert_eq!(
            map.to_source_range(Range::new(Position::new(0, 2), Position::new(0, 5))),
            Some(Range::new(Position::new(1, 2), Position::new(1, 5)))
        );
        assert_eq!(
            map.enclosing_generated_range(source.full_range()),
            Some(generated.full_range())
        );
    }
}
