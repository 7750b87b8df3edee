use crate::config::Roi;
use anyhow::{Result, bail};

/// 解碼後的 RGB24 影格
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

/// 單通道亮度圖
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrayFrame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl Frame {
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * 3;
        if data.len() != expected {
            bail!(
                "影格資料長度不符: {}x{} 需要 {} bytes，實際 {} bytes",
                width,
                height,
                expected,
                data.len()
            );
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    #[must_use]
    pub fn area(&self) -> f64 {
        f64::from(self.width) * f64::from(self.height)
    }

    /// 裁切 ROI 並轉為亮度圖（ITU-R BT.601 權重）
    pub fn to_gray(&self, roi: Option<Roi>) -> Result<GrayFrame> {
        let (x1, y1, x2, y2) = match roi {
            Some(roi) => (
                roi.x1,
                roi.y1,
                roi.x2.min(self.width),
                roi.y2.min(self.height),
            ),
            None => (0, 0, self.width, self.height),
        };

        if x1 >= x2 || y1 >= y2 {
            bail!(
                "ROI 超出畫面範圍: 畫面 {}x{}，ROI [{}, {}, {}, {}]",
                self.width,
                self.height,
                x1,
                y1,
                x2,
                y2
            );
        }

        let width = x2 - x1;
        let height = y2 - y1;
        let stride = self.width as usize * 3;
        let mut data = Vec::with_capacity(width as usize * height as usize);

        for y in y1..y2 {
            let row_start = y as usize * stride + x1 as usize * 3;
            let row = &self.data[row_start..row_start + width as usize * 3];
            data.extend(row.chunks_exact(3).map(|px| {
                let luma = 77 * u32::from(px[0]) + 150 * u32::from(px[1]) + 29 * u32::from(px[2]);
                ((luma + 128) >> 8) as u8
            }));
        }

        Ok(GrayFrame {
            width,
            height,
            data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(width: u32, height: u32, rgb: [u8; 3]) -> Frame {
        let data = rgb
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 3)
            .collect();
        Frame::new(width, height, data).unwrap()
    }

    #[test]
    fn test_new_rejects_wrong_length() {
        assert!(Frame::new(2, 2, vec![0; 11]).is_err());
        assert!(Frame::new(2, 2, vec![0; 12]).is_ok());
    }

    #[test]
    fn test_gray_conversion_weights() {
        assert_eq!(solid(1, 1, [255, 255, 255]).to_gray(None).unwrap().data, vec![255]);
        assert_eq!(solid(1, 1, [0, 0, 0]).to_gray(None).unwrap().data, vec![0]);

        let green = solid(1, 1, [0, 255, 0]).to_gray(None).unwrap().data[0];
        let blue = solid(1, 1, [0, 0, 255]).to_gray(None).unwrap().data[0];
        assert!(green > blue);
    }

    #[test]
    fn test_roi_crop() {
        let mut frame = solid(4, 4, [0, 0, 0]);
        // (2, 1) 設為白色
        let offset = (4 + 2) * 3;
        frame.data[offset..offset + 3].copy_from_slice(&[255, 255, 255]);

        let roi = Roi {
            x1: 2,
            y1: 1,
            x2: 4,
            y2: 3,
        };
        let gray = frame.to_gray(Some(roi)).unwrap();
        assert_eq!((gray.width, gray.height), (2, 2));
        assert_eq!(gray.data, vec![255, 0, 0, 0]);
    }

    #[test]
    fn test_roi_is_clamped_and_rejected_when_empty() {
        let frame = solid(4, 4, [10, 10, 10]);
        let clamped = Roi {
            x1: 2,
            y1: 2,
            x2: 100,
            y2: 100,
        };
        let gray = frame.to_gray(Some(clamped)).unwrap();
        assert_eq!((gray.width, gray.height), (2, 2));

        let outside = Roi {
            x1: 10,
            y1: 0,
            x2: 20,
            y2: 4,
        };
        assert!(frame.to_gray(Some(outside)).is_err());
    }
}
