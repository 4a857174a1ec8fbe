use image::GrayImage;

use crate::HashError;

/// A rectangular grid of grayscale intensities or transform coefficients.
///
/// Values are stored row-major and addressed as `field[(row, col)]`. The scale is up to the
/// producer (`0..=255`, `0.0..=1.0` and raw DCT amplitudes all work) since every hash only
/// compares values against each other or against a threshold drawn from the same field.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelField {
    width: u32,
    height: u32,
    data: Vec<f64>,
}

impl PixelField {
    /// Wrap row-major `data` as a `width x height` field.
    ///
    /// Returns `None` if `data.len() != width * height`.
    pub fn from_raw(width: u32, height: u32, data: Vec<f64>) -> Option<Self> {
        if data.len() != width as usize * height as usize {
            return None;
        }

        Some(PixelField {
            width,
            height,
            data,
        })
    }

    /// Build a field from a slice of rows, `rows[row][col]`.
    ///
    /// ## Errors:
    /// Returns `HashError::RaggedRow` if any row differs in length from the first one, and
    /// `HashError::FieldTooLarge` if either side does not fit in a `u32`.
    pub fn from_rows<R, T>(rows: &[R]) -> Result<Self, HashError>
    where
        R: AsRef<[T]>,
        T: Copy + Into<f64>,
    {
        let width = rows.first().map_or(0, |row| row.as_ref().len());
        let (Ok(field_width), Ok(field_height)) = (u32::try_from(width), u32::try_from(rows.len()))
        else {
            return Err(HashError::FieldTooLarge {
                width,
                height: rows.len(),
            });
        };

        let mut data = Vec::with_capacity(width * rows.len());

        for (idx, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            if row.len() != width {
                return Err(HashError::RaggedRow {
                    row: idx,
                    expected: width,
                    found: row.len(),
                });
            }
            data.extend(row.iter().map(|&val| val.into()));
        }

        Ok(PixelField {
            width: field_width,
            height: field_height,
            data,
        })
    }

    /// Build a field by evaluating `f(row, col)` for every cell.
    pub fn from_fn<F>(width: u32, height: u32, mut f: F) -> Self
    where
        F: FnMut(u32, u32) -> f64,
    {
        let mut data = Vec::with_capacity(width as usize * height as usize);
        for row in 0..height {
            for col in 0..width {
                data.push(f(row, col));
            }
        }

        PixelField {
            width,
            height,
            data,
        }
    }

    /// Number of columns.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Number of rows.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// `true` if the field has no cells at all.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// All values in raster order.
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Iterate the rows from top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[f64]> + '_ {
        // `chunks_exact` panics on a zero chunk size; a zero-width field has no rows to yield
        self.data.chunks_exact(self.width.max(1) as usize)
    }

    /// Replace the values while keeping the shape.
    pub(crate) fn map_data<F>(self, f: F) -> Self
    where
        F: FnOnce(Vec<f64>) -> Vec<f64>,
    {
        let data = f(self.data);
        debug_assert_eq!(data.len(), self.width as usize * self.height as usize);
        PixelField { data, ..self }
    }

    /// Copy out the top-left `side x side` block in raster order.
    ///
    /// The caller guarantees the block fits inside the field.
    pub(crate) fn corner(&self, side: u32) -> Vec<f64> {
        debug_assert!(side <= self.width && side <= self.height);
        self.rows()
            .take(side as usize)
            .flat_map(|row| &row[..side as usize])
            .copied()
            .collect()
    }
}

impl std::ops::Index<(u32, u32)> for PixelField {
    type Output = f64;

    fn index(&self, (row, col): (u32, u32)) -> &f64 {
        assert!(col < self.width, "column {col} out of bounds");
        &self.data[row as usize * self.width as usize + col as usize]
    }
}

impl From<&GrayImage> for PixelField {
    fn from(img: &GrayImage) -> Self {
        PixelField {
            width: img.width(),
            height: img.height(),
            data: img.as_raw().iter().map(|&luma| f64::from(luma)).collect(),
        }
    }
}

#[cfg(test)]
mod test {
    use image::{GrayImage, Luma};

    use super::PixelField;
    use crate::HashError;

    #[test]
    fn rows_are_row_major() {
        let field = PixelField::from_rows(&[[1u8, 2, 3], [4, 5, 6]]).unwrap();
        assert_eq!((field.width(), field.height()), (3, 2));
        assert_eq!(field[(1, 0)], 4.0);
        assert_eq!(field[(0, 2)], 3.0);

        let rows: Vec<&[f64]> = field.rows().collect();
        assert_eq!(rows, [&[1.0, 2.0, 3.0][..], &[4.0, 5.0, 6.0][..]]);
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let rows = vec![vec![1.0f64, 2.0], vec![3.0]];
        assert_eq!(
            PixelField::from_rows(&rows),
            Err(HashError::RaggedRow {
                row: 1,
                expected: 2,
                found: 1
            })
        );
    }

    #[test]
    fn no_rows_is_empty() {
        let rows: Vec<Vec<f64>> = Vec::new();
        let field = PixelField::from_rows(&rows).unwrap();
        assert!(field.is_empty());
        assert_eq!(field.rows().count(), 0);
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn too_many_rows_are_rejected() {
        #[derive(Clone, Copy)]
        struct NoCells;

        impl AsRef<[f64]> for NoCells {
            fn as_ref(&self) -> &[f64] {
                &[]
            }
        }

        // zero-sized, so this costs no memory
        let rows = [NoCells; 1 << 32];
        assert_eq!(
            PixelField::from_rows::<NoCells, f64>(&rows),
            Err(HashError::FieldTooLarge {
                width: 0,
                height: 1 << 32
            })
        );
    }

    #[test]
    fn raw_length_must_match() {
        assert!(PixelField::from_raw(3, 3, vec![0.0; 8]).is_none());
        assert!(PixelField::from_raw(3, 3, vec![0.0; 9]).is_some());
    }

    #[test]
    fn corner_block() {
        let field = PixelField::from_fn(4, 4, |row, col| f64::from(row * 4 + col));
        assert_eq!(field.corner(2), [0.0, 1.0, 4.0, 5.0]);
    }

    #[test]
    fn from_gray_image() {
        let img = GrayImage::from_fn(2, 3, |x, y| Luma([(y * 2 + x) as u8]));
        let field = PixelField::from(&img);
        assert_eq!((field.width(), field.height()), (2, 3));
        assert_eq!(field.as_slice(), [0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
    }
}
