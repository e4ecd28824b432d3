// This file is part of nestfmt.
// Copyright (C) 2025 Midnight Foundation
// SPDX-License-Identifier: Apache-2.0

//! Breadth-first levels of an embedding tree.

use crate::region::{EmbeddedTree, Region};

/// Computes the regions at each breadth-first depth, one level at a time.
///
/// Levels are cached as region names. Level `l + 1` is derived the first
/// time it is asked for, from the level-`l` names resolved against the tree
/// passed in, so a tree rebuilt between calls (same names, new text) is
/// picked up without re-walking from the root. An empty level is the only
/// termination signal.
#[derive(Debug, Clone)]
pub struct LevelTraversal {
    levels: Vec<Vec<String>>,
}

impl LevelTraversal {
    pub fn new(root_name: impl Into<String>) -> Self {
        Self {
            levels: vec![vec![root_name.into()]],
        }
    }

    /// Regions at depth `level` (level 0 is the root).
    pub fn level_of<'t>(&mut self, level: usize, tree: &'t EmbeddedTree) -> Vec<&'t Region> {
        while self.levels.len() <= level {
            let next: Vec<String> = self
                .levels
                .last()
                .map(|names| {
                    names
                        .iter()
                        .filter_map(|name| tree.region(name))
                        .flat_map(|region| region.children())
                        .map(|child| child.name().to_string())
                        .collect()
                })
                .unwrap_or_default();
            self.levels.push(next);
        }

        self.levels[level]
            .iter()
            .filter_map(|name| tree.region(name))
            .collect()
    }
}
