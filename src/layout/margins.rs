//! Margin collapsing.

/// Return the amount of collapsed margin for a list of adjoining margins:
/// the largest positive margin plus the most negative one.
pub fn collapse_margin(adjoining_margins: &[f64]) -> f64 {
    let mut max_pos = 0.0_f64;
    let mut min_neg = 0.0_f64;
    for &margin in adjoining_margins {
        if margin > max_pos {
            max_pos = margin;
        } else if margin < min_neg {
            min_neg = margin;
        }
    }
    max_pos + min_neg
}

/// The adjoining margins of a block being laid out.
///
/// A block starts with the list its parent was collapsing and keeps adding
/// to that same list until a border, padding, clearance or a laid-out child
/// settles it. While the list is still shared, every margin pushed here also
/// belongs to the parent (and to the block's own top-margin collapse), so
/// those margins are recorded in `leading`.
#[derive(Debug, Clone)]
pub(crate) struct AdjoiningMargins {
    margins: Vec<f64>,
    shared: bool,
    leading: Vec<f64>,
    /// Snapshot of the shared list taken when it stopped being shared.
    own: Option<Vec<f64>>,
}

impl AdjoiningMargins {
    /// Continue the parent's list.
    pub fn inherit(margins: Vec<f64>) -> Self {
        Self {
            margins,
            shared: true,
            leading: Vec::new(),
            own: None,
        }
    }

    pub fn push(&mut self, margin: f64) {
        self.margins.push(margin);
        if self.shared {
            self.leading.push(margin);
        }
    }

    /// Margins a child appended to the list it was handed.
    pub fn extend_from_child(&mut self, margins: &[f64]) {
        for &margin in margins {
            self.push(margin);
        }
    }

    /// Start collecting into a new list.
    pub fn replace(&mut self, margins: Vec<f64>) {
        if self.shared {
            self.own = Some(self.margins.clone());
            self.shared = false;
        }
        self.margins = margins;
    }

    /// Take the list a child returned. A child that never replaced its list
    /// hands back the very list it was given, which is already ours.
    pub fn adopt(&mut self, margins: Vec<f64>, child_shared: bool) {
        if !child_shared {
            self.replace(margins);
        }
    }

    pub fn clear(&mut self) {
        self.replace(Vec::new());
    }

    pub fn collapse(&self) -> f64 {
        collapse_margin(&self.margins)
    }

    /// Collapse as if `extra` were appended, without appending it.
    pub fn collapse_with(&self, extra: f64) -> f64 {
        let mut margins = self.margins.clone();
        margins.push(extra);
        collapse_margin(&margins)
    }

    pub fn is_empty(&self) -> bool {
        self.margins.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.margins
    }

    /// The list the block's own top margin collapses with: the parent's
    /// list as it stood when this block stopped sharing it.
    pub fn box_margins(&self) -> Vec<f64> {
        match &self.own {
            Some(own) => own.clone(),
            None => self.margins.clone(),
        }
    }

    /// Consume into (list, still shared, margins added while shared).
    pub fn into_parts(self) -> (Vec<f64>, bool, Vec<f64>) {
        (self.margins, self.shared, self.leading)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_list_collapses_to_zero() {
        assert_eq!(collapse_margin(&[]), 0.0);
    }

    #[test]
    fn positive_and_negative_margins() {
        assert_eq!(collapse_margin(&[10.0, 20.0]), 20.0);
        assert_eq!(collapse_margin(&[-5.0, -15.0]), -15.0);
        assert_eq!(collapse_margin(&[10.0, -4.0, 25.0, -9.0]), 16.0);
    }

    #[test]
    fn collapse_is_order_independent() {
        let margins = [3.0, -7.0, 12.0, 0.0, -2.0, 8.0];
        let expected = collapse_margin(&margins);
        let mut reversed = margins;
        reversed.reverse();
        assert_eq!(collapse_margin(&reversed), expected);
        let mut rotated = margins;
        rotated.rotate_left(2);
        assert_eq!(collapse_margin(&rotated), expected);
        assert_eq!(expected, 12.0 - 7.0);
    }

    #[test]
    fn shared_list_records_leading_margins() {
        let mut margins = AdjoiningMargins::inherit(vec![5.0]);
        margins.push(10.0);
        margins.extend_from_child(&[15.0]);
        margins.clear();
        margins.push(20.0);
        let own = margins.box_margins();
        let (list, shared, leading) = margins.into_parts();
        assert_eq!(own, vec![5.0, 10.0, 15.0]);
        assert_eq!(list, vec![20.0]);
        assert!(!shared);
        assert_eq!(leading, vec![10.0, 15.0]);
    }

    #[test]
    fn adopting_the_shared_list_keeps_sharing() {
        let mut margins = AdjoiningMargins::inherit(vec![]);
        margins.push(4.0);
        let child_list = margins.as_slice().to_vec();
        margins.adopt(child_list, true);
        margins.push(6.0);
        let (list, shared, leading) = margins.into_parts();
        assert!(shared);
        assert_eq!(list, vec![4.0, 6.0]);
        assert_eq!(leading, vec![4.0, 6.0]);
    }
}
