/*
MIT License

Copyright (c) 2024 Philipp Schuster

Permission is hereby granted, free of charge, to any person obtaining a copy
of this software and associated documentation files (the "Software"), to deal
in the Software without restriction, including without limitation the rights
to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
copies of the Software, and to permit persons to whom the Software is
furnished to do so, subject to the following conditions:

The above copyright notice and this permission notice shall be included in all
copies or substantial portions of the Software.

THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
SOFTWARE.
*/

//! Metrical structure of a loop: a tree that recursively subdivides the loop
//! into bars, beats and finer divisions.
//!
//! The tree lives in an arena. Nodes reference their parent and children by
//! index.

use super::TimeSignature;
use std::collections::BTreeMap;

/// Role of a division (tatum) position within the metrical structure.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MetricalPosition {
    /// How structurally important the position is: 0 for downbeats, higher
    /// values for weaker positions.
    pub level: usize,
    /// Which occurrence of that level within its parent period the position
    /// is. Downbeats are all of ordinal 0.
    pub ordinal: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct TimeDivNode {
    /// First division covered by this node.
    begin: usize,
    /// Number of divisions covered by this node.
    len: usize,
    /// Distance from the root. The root covers the whole loop and the bars
    /// are its children.
    depth: usize,
    parent: Option<usize>,
    /// Position within the parent's children.
    index_in_parent: usize,
    children: Vec<usize>,
}

/// Subdivision tree of a loop with a given number of divisions, bars and time
/// signature.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TimeDivTree {
    nodes: Vec<TimeDivNode>,
    num_divisions: usize,
}

impl TimeDivTree {
    const ROOT: usize = 0;

    /// Builds the tree. Returns `None` if the divisions can't be evenly
    /// distributed among the bars and beats.
    ///
    /// Each bar is subdivided by the time signature's pattern as long as
    /// the pattern's factors divide the remaining divisions. Divisions that
    /// are left over are split into single tatums.
    #[must_use]
    pub fn new(num_divisions: usize, num_bars: usize, time_signature: TimeSignature) -> Option<Self> {
        let num_beats = num_bars * time_signature.beats_per_bar();
        if num_beats == 0 || num_divisions == 0 || num_divisions % num_beats != 0 {
            return None;
        }

        let mut tree = Self {
            nodes: vec![TimeDivNode {
                begin: 0,
                len: num_divisions,
                depth: 0,
                parent: None,
                index_in_parent: 0,
                children: Vec::new(),
            }],
            num_divisions,
        };

        let mut leaves = tree.split(Self::ROOT, num_bars);
        for &factor in time_signature.subdivision_pattern() {
            if tree.nodes[leaves[0]].len % factor != 0 {
                break;
            }
            leaves = leaves
                .into_iter()
                .flat_map(|leaf| tree.split(leaf, factor))
                .collect();
        }

        let tatums_per_leaf = tree.nodes[leaves[0]].len;
        if tatums_per_leaf > 1 {
            for leaf in leaves {
                tree.split(leaf, tatums_per_leaf);
            }
        }

        Some(tree)
    }

    /// Splits a node into `factor` children of equal length and returns
    /// their indices.
    fn split(&mut self, node: usize, factor: usize) -> Vec<usize> {
        let TimeDivNode {
            begin, len, depth, ..
        } = self.nodes[node];
        debug_assert_eq!(len % factor, 0);
        let child_len = len / factor;

        let children = (0..factor)
            .map(|i| {
                self.nodes.push(TimeDivNode {
                    begin: begin + i * child_len,
                    len: child_len,
                    depth: depth + 1,
                    parent: Some(node),
                    index_in_parent: i,
                    children: Vec::new(),
                });
                self.nodes.len() - 1
            })
            .collect::<Vec<_>>();
        self.nodes[node].children = children.clone();
        children
    }

    /// Number of divisions of the loop.
    #[must_use]
    pub const fn num_divisions(&self) -> usize {
        self.num_divisions
    }

    /// Returns the metrical position of every division.
    ///
    /// A division that starts the `i`-th (`i > 0`) child of a node at depth
    /// `d` has level `d`. Its ordinal is `i - 1`, except for downbeats,
    /// which all share ordinal 0.
    #[must_use]
    pub fn metrical_positions(&self) -> Vec<MetricalPosition> {
        let mut positions = vec![MetricalPosition::default(); self.num_divisions];
        for node in self.nodes.iter().filter(|node| node.index_in_parent > 0) {
            let Some(parent) = node.parent else {
                continue;
            };
            let ordinal = if parent == Self::ROOT {
                0
            } else {
                node.index_in_parent - 1
            };
            positions[node.begin] = MetricalPosition {
                level: self.nodes[parent].depth,
                ordinal,
            };
        }
        positions
    }

    /// Returns the metrical level of every division.
    #[must_use]
    pub fn levels(&self) -> Vec<usize> {
        self.metrical_positions()
            .into_iter()
            .map(|pos| pos.level)
            .collect()
    }

    /// Returns all unordered pairs of divisions that play the same metrical
    /// role, i.e., that have the same level and ordinal.
    #[must_use]
    pub fn comparison_pairs(&self) -> Vec<(usize, usize)> {
        let mut series = BTreeMap::<MetricalPosition, Vec<usize>>::new();
        for (division, position) in self.metrical_positions().into_iter().enumerate() {
            series.entry(position).or_default().push(division);
        }
        series
            .values()
            .flat_map(|divisions| {
                divisions.iter().enumerate().flat_map(move |(i, &a)| {
                    divisions[i + 1..].iter().map(move |&b| (a, b))
                })
            })
            .collect()
    }
}
