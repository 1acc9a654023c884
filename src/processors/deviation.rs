use crate::error::{AnalysisError, Result};
use crate::models::DeviationKind;
use ndarray::{Array3, ArrayView3, Zip};
use std::collections::BTreeMap;

/// Elementwise deviation fields of one time window, one per deviation kind.
///
/// Computed once per window and shared read-only by every ring worker.
#[derive(Debug, Default)]
pub struct DeviationFields {
    fields: BTreeMap<DeviationKind, Array3<f64>>,
}

impl DeviationFields {
    /// Compare an observed field `a` against the reference `b`
    pub fn compute(
        observed: ArrayView3<'_, f64>,
        reference: ArrayView3<'_, f64>,
        kinds: &[DeviationKind],
    ) -> Result<Self> {
        if observed.shape()[1..] != reference.shape()[1..] {
            return Err(AnalysisError::shape_mismatch(
                "compared grid fields",
                &reference.shape()[1..],
                &observed.shape()[1..],
            ));
        }
        if observed.shape()[0] != reference.shape()[0] {
            return Err(AnalysisError::shape_mismatch(
                "compared time steps",
                &reference.shape()[..1],
                &observed.shape()[..1],
            ));
        }

        let fields = kinds
            .iter()
            .map(|&kind| {
                let field = Zip::from(&observed)
                    .and(&reference)
                    .map_collect(|&a, &b| kind.apply(a, b));
                (kind, field)
            })
            .collect();

        Ok(Self { fields })
    }

    pub fn get(&self, kind: DeviationKind) -> Result<&Array3<f64>> {
        self.fields.get(&kind).ok_or_else(|| {
            AnalysisError::MissingData(format!("No {} deviation field computed", kind.suffix()))
        })
    }

    pub fn kinds(&self) -> impl Iterator<Item = DeviationKind> + '_ {
        self.fields.keys().copied()
    }

    /// `(time, Y, X)` extent shared by every field
    pub fn dim(&self) -> Option<(usize, usize, usize)> {
        self.fields.values().next().map(|f| f.dim())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_all_kinds() {
        let observed = Array3::from_elem((2, 2, 2), 3.0);
        let reference = Array3::from_elem((2, 2, 2), 4.0);
        let kinds = [
            DeviationKind::Absolute,
            DeviationKind::Squared,
            DeviationKind::AbsolutePercentage,
        ];

        let fields = DeviationFields::compute(observed.view(), reference.view(), &kinds).unwrap();

        assert!(fields.get(DeviationKind::Absolute).unwrap().iter().all(|&v| v == 1.0));
        assert!(fields.get(DeviationKind::Squared).unwrap().iter().all(|&v| v == 1.0));
        assert!(fields
            .get(DeviationKind::AbsolutePercentage)
            .unwrap()
            .iter()
            .all(|&v| v == 25.0));
        assert_eq!(fields.kinds().count(), 3);
        assert_eq!(fields.dim(), Some((2, 2, 2)));
    }

    #[test]
    fn test_missing_kind() {
        let field = Array3::<f64>::zeros((1, 1, 1));
        let fields =
            DeviationFields::compute(field.view(), field.view(), &[DeviationKind::Absolute]).unwrap();
        assert!(fields.get(DeviationKind::Squared).is_err());
    }

    #[test]
    fn test_shape_mismatch() {
        let observed = Array3::<f64>::zeros((1, 3, 4));
        let reference = Array3::<f64>::zeros((1, 4, 3));
        let err = DeviationFields::compute(observed.view(), reference.view(), &[DeviationKind::Squared])
            .unwrap_err();
        assert!(matches!(err, AnalysisError::ShapeMismatch { .. }));
    }
}
