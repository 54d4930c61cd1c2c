use ndarray::ArrayView3;

/// A decoded raster image: contiguous RGB bytes in row-major order.
///
/// Format conversion happens at codec boundaries only; the domain layer
/// treats pixel data as opaque. A `Frame` is always the product of a
/// successful decode, so its dimensions are positive.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (channels as usize),
            "data length must equal width * height * channels"
        );
        Self {
            data,
            width,
            height,
            channels,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(self.shape(), &self.data)
            .expect("Frame data length must match dimensions")
    }

    /// Extracts the sub-region `[x1, x2) x [y1, y2)` as a new frame.
    ///
    /// Callers must pass coordinates already clipped to this frame's
    /// bounds with `x2 > x1` and `y2 > y1`.
    pub fn crop(&self, x1: u32, y1: u32, x2: u32, y2: u32) -> Frame {
        debug_assert!(x1 < x2 && x2 <= self.width, "x range out of bounds");
        debug_assert!(y1 < y2 && y2 <= self.height, "y range out of bounds");

        let channels = self.channels as usize;
        let row_stride = self.width as usize * channels;
        let crop_w = (x2 - x1) as usize;
        let crop_h = (y2 - y1) as usize;

        let mut data = Vec::with_capacity(crop_w * crop_h * channels);
        for row in y1 as usize..y2 as usize {
            let start = row * row_stride + x1 as usize * channels;
            data.extend_from_slice(&self.data[start..start + crop_w * channels]);
        }

        Frame::new(data, crop_w as u32, crop_h as u32, self.channels)
    }

    fn shape(&self) -> (usize, usize, usize) {
        (
            self.height as usize,
            self.width as usize,
            self.channels as usize,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient_frame(w: u32, h: u32) -> Frame {
        let mut data = Vec::with_capacity((w * h * 3) as usize);
        for y in 0..h {
            for x in 0..w {
                data.push(x as u8);
                data.push(y as u8);
                data.push(0);
            }
        }
        Frame::new(data, w, h, 3)
    }

    #[test]
    fn test_construction_and_accessors() {
        let data = vec![0u8; 12]; // 2x2x3
        let frame = Frame::new(data.clone(), 2, 2, 3);
        assert_eq!(frame.width(), 2);
        assert_eq!(frame.height(), 2);
        assert_eq!(frame.channels(), 3);
        assert_eq!(frame.data(), &data[..]);
    }

    #[test]
    #[should_panic(expected = "data length must equal width * height * channels")]
    fn test_mismatched_data_length_panics_in_debug() {
        let data = vec![0u8; 10]; // wrong size for 2x2x3
        Frame::new(data, 2, 2, 3);
    }

    #[test]
    fn test_as_ndarray_shape() {
        let data = vec![0u8; 24]; // 2x4x3
        let frame = Frame::new(data, 4, 2, 3);
        let arr = frame.as_ndarray();
        assert_eq!(arr.shape(), &[2, 4, 3]); // (height, width, channels)
    }

    #[test]
    fn test_as_ndarray_pixel_access() {
        // 2x2 RGB: set pixel (row=1, col=0) to red
        let mut data = vec![0u8; 12];
        data[6] = 255; // row=1, col=0, R
        let frame = Frame::new(data, 2, 2, 3);
        let arr = frame.as_ndarray();
        assert_eq!(arr[[1, 0, 0]], 255);
        assert_eq!(arr[[1, 0, 1]], 0);
        assert_eq!(arr[[1, 0, 2]], 0);
    }

    #[test]
    fn test_crop_dimensions() {
        let frame = gradient_frame(10, 8);
        let crop = frame.crop(2, 1, 7, 5);
        assert_eq!(crop.width(), 5);
        assert_eq!(crop.height(), 4);
        assert_eq!(crop.channels(), 3);
    }

    #[test]
    fn test_crop_copies_expected_pixels() {
        let frame = gradient_frame(10, 8);
        let crop = frame.crop(3, 2, 6, 4);
        let arr = crop.as_ndarray();
        // Top-left of the crop maps to (x=3, y=2) in the source
        assert_eq!(arr[[0, 0, 0]], 3);
        assert_eq!(arr[[0, 0, 1]], 2);
        // Bottom-right maps to (x=5, y=3)
        assert_eq!(arr[[1, 2, 0]], 5);
        assert_eq!(arr[[1, 2, 1]], 3);
    }

    #[test]
    fn test_crop_full_frame_is_identity() {
        let frame = gradient_frame(6, 4);
        let crop = frame.crop(0, 0, 6, 4);
        assert_eq!(crop, frame);
    }

    #[test]
    fn test_crop_single_pixel() {
        let frame = gradient_frame(10, 10);
        let crop = frame.crop(4, 7, 5, 8);
        assert_eq!(crop.width(), 1);
        assert_eq!(crop.height(), 1);
        assert_eq!(crop.data(), &[4, 7, 0]);
    }
}
