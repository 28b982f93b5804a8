//! Example indices grouped by class: stratified draws and bootstrap resampling.
//!
//! A [`ClassSet`] never holds example payloads, only indices into the
//! caller's dataset. Indices may repeat after bootstrap resampling.

use rand::Rng;

/// Example indices grouped by class ordinal.
#[derive(Debug, Clone)]
pub struct ClassSet {
    members: Vec<Vec<usize>>,
    // Ordinals of the classes with at least one member.
    non_empty: Vec<usize>,
    universe: usize,
}

/// A bootstrap resample and its out-of-bag remainder.
#[derive(Debug, Clone)]
pub struct Bootstrap {
    in_bag: Vec<usize>,
    selected: Vec<bool>,
    out_of_bag: Vec<usize>,
}

impl Bootstrap {
    /// Drawn example indices, with repeats, grouped by class.
    #[must_use]
    pub fn in_bag(&self) -> &[usize] {
        &self.in_bag
    }

    /// Examples of the source set that were never drawn, ascending.
    #[must_use]
    pub fn out_of_bag(&self) -> &[usize] {
        &self.out_of_bag
    }

    /// True if example `index` was drawn at least once.
    #[must_use]
    pub fn is_selected(&self, index: usize) -> bool {
        self.selected.get(index).copied().unwrap_or(false)
    }

    /// Consume and return `(in_bag, out_of_bag)`.
    #[must_use]
    pub fn into_parts(self) -> (Vec<usize>, Vec<usize>) {
        (self.in_bag, self.out_of_bag)
    }
}

impl ClassSet {
    /// Group every example `0..labels.len()` by its label.
    ///
    /// Labels must be below `n_classes`.
    #[must_use]
    pub fn new(labels: &[usize], n_classes: usize) -> Self {
        let all: Vec<usize> = (0..labels.len()).collect();
        Self::from_indices(&all, labels, n_classes)
    }

    /// Group the given example indices by label.
    #[must_use]
    pub fn from_indices(indices: &[usize], labels: &[usize], n_classes: usize) -> Self {
        let mut members = vec![Vec::new(); n_classes];
        for &i in indices {
            members[labels[i]].push(i);
        }
        let non_empty = (0..n_classes).filter(|&c| !members[c].is_empty()).collect();
        Self {
            members,
            non_empty,
            universe: labels.len(),
        }
    }

    /// Number of classes, including empty ones.
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.members.len()
    }

    /// Total number of (possibly repeated) example indices.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.iter().map(Vec::len).sum()
    }

    /// True if no class has any example.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.non_empty.is_empty()
    }

    /// Members of class `class`.
    #[must_use]
    pub fn class(&self, class: usize) -> &[usize] {
        &self.members[class]
    }

    /// Count of members per class.
    #[must_use]
    pub fn class_counts(&self) -> Vec<usize> {
        self.members.iter().map(Vec::len).collect()
    }

    /// Draw a class uniformly among the non-empty ones, then an example
    /// uniformly within it. `None` when the set is empty.
    pub fn sample(&self, rng: &mut impl Rng) -> Option<usize> {
        if self.non_empty.is_empty() {
            return None;
        }
        let class = &self.members[self.non_empty[rng.gen_range(0..self.non_empty.len())]];
        Some(class[rng.gen_range(0..class.len())])
    }

    /// Stratified bootstrap: each class is resampled with replacement to its
    /// own size. Members never drawn form the out-of-bag set.
    pub fn bootstrap(&self, rng: &mut impl Rng) -> Bootstrap {
        let mut selected = vec![false; self.universe];
        let mut present = vec![false; self.universe];
        let mut in_bag = Vec::with_capacity(self.len());

        for class in &self.members {
            for &i in class {
                present[i] = true;
            }
            for _ in 0..class.len() {
                let idx = class[rng.gen_range(0..class.len())];
                selected[idx] = true;
                in_bag.push(idx);
            }
        }

        let out_of_bag = (0..self.universe)
            .filter(|&i| present[i] && !selected[i])
            .collect();

        Bootstrap {
            in_bag,
            selected,
            out_of_bag,
        }
    }
}
