use serde::{Deserialize, Serialize};

use crate::aggregation::ordered_set::OrderedSet;

/// How the shorter column is padded when aligning tracking ids and plates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillMode {
    /// Repeat the column's last value; an empty column stays null.
    #[default]
    ForwardFill,
    /// Leave padded cells null.
    Independent,
}

/// One aligned output row. The two cells are not related to each other;
/// they only share a row position.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ResultRow {
    pub tracking_id: Option<String>,
    pub plate: Option<String>,
}

/// Two-column table of tracking ids and distinct plates.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResultTable {
    rows: Vec<ResultRow>,
}

impl ResultTable {
    /// Aligns both columns to `max(len)` rows, padding per `mode`.
    pub fn align(tracking_ids: &OrderedSet, plates: &OrderedSet, mode: FillMode) -> Self {
        let len = tracking_ids.len().max(plates.len());
        let tracking = pad(tracking_ids, len, mode);
        let plates = pad(plates, len, mode);

        let rows = tracking
            .into_iter()
            .zip(plates)
            .map(|(tracking_id, plate)| ResultRow { tracking_id, plate })
            .collect();
        Self { rows }
    }

    pub fn from_rows(rows: Vec<ResultRow>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[ResultRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn pad(values: &OrderedSet, len: usize, mode: FillMode) -> Vec<Option<String>> {
    let filler = match mode {
        FillMode::ForwardFill => values.last(),
        FillMode::Independent => None,
    };
    (0..len)
        .map(|i| values.get(i).or(filler).map(str::to_string))
        .collect()
}
