use std::sync::Arc;

use rustdct::{Dct2, DctPlanner, RequiredScratch, TransformType2And3};

use crate::PixelField;

/// A planned, unnormalized 2D DCT-II over square fields.
pub(crate) struct DctCtxt {
    dct: Arc<dyn TransformType2And3<f64>>,
    side: u32,
}

impl DctCtxt {
    pub(crate) fn new(side: u32) -> Self {
        let mut planner = DctPlanner::new();
        DctCtxt {
            dct: planner.plan_dct2(side as usize),
            side,
        }
    }

    /// Transform the rows, then the columns, of a `side x side` field.
    pub(crate) fn dct_2d(&self, field: PixelField) -> PixelField {
        debug_assert_eq!((field.width(), field.height()), (self.side, self.side));
        let side = self.side as usize;

        field.map_data(|mut vals| {
            let mut scratch = vec![0.; self.dct.get_scratch_len()];
            let mut transposed = vec![0.; vals.len()];

            for row in vals.chunks_exact_mut(side) {
                self.dct.process_dct2_with_scratch(row, &mut scratch);
            }

            // columns become rows so the same 1D plan applies
            transpose::transpose(&vals, &mut transposed, side, side);
            for col in transposed.chunks_exact_mut(side) {
                self.dct.process_dct2_with_scratch(col, &mut scratch);
            }
            transpose::transpose(&transposed, &mut vals, side, side);

            vals
        })
    }
}
