// Raster rendering of map markers, used for PNG snapshots of the map view.
// Standalone listings are small blue pins, clusters are larger red discs whose
// size grows with the member count. Clusters are drawn last so they sit on top.

pub mod map_raster {
    use crate::core_modules::cluster_engine::MapPoint;
    use crate::core_modules::normalizer::BoundingBox;
    use crate::error::Result;
    use image::codecs::png::PngEncoder;
    use image::{ExtendedColorType, ImageEncoder, Rgba, RgbaImage};
    use std::path::Path;

    pub const BACKGROUND: Rgba<u8> = Rgba([191, 219, 254, 255]);
    pub const PIN: Rgba<u8> = Rgba([37, 99, 235, 255]);
    pub const CLUSTER: Rgba<u8> = Rgba([239, 68, 68, 255]);
    pub const OUTLINE: Rgba<u8> = Rgba([255, 255, 255, 255]);

    const PIN_RADIUS: i64 = 6;
    const CLUSTER_BASE_RADIUS: i64 = 10;
    const CLUSTER_MAX_GROWTH: usize = 10;

    /// Converts a marker's normalized position to a pixel, or `None` when it
    /// falls outside the canvas.
    pub fn pixel_position(point: &MapPoint, bounds: &BoundingBox, width: u32, height: u32) -> Option<(i64, i64)> {
        let position = point.marker_position(bounds);
        if !(0.0..=100.0).contains(&position.x) || !(0.0..=100.0).contains(&position.y) {
            return None;
        }
        let px = (position.x / 100.0 * (width.saturating_sub(1)) as f64).round() as i64;
        let py = (position.y / 100.0 * (height.saturating_sub(1)) as f64).round() as i64;
        Some((px, py))
    }

    pub fn render(points: &[MapPoint], bounds: &BoundingBox, width: u32, height: u32) -> RgbaImage {
        let mut canvas = RgbaImage::from_pixel(width, height, BACKGROUND);

        let (clusters, pins): (Vec<&MapPoint>, Vec<&MapPoint>) =
            points.iter().partition(|p| matches!(p, MapPoint::Cluster(_)));

        for point in pins {
            if let Some((x, y)) = pixel_position(point, bounds, width, height) {
                fill_disc(&mut canvas, x, y, PIN_RADIUS + 2, OUTLINE);
                fill_disc(&mut canvas, x, y, PIN_RADIUS, PIN);
                fill_disc(&mut canvas, x, y, 2, OUTLINE);
            }
        }

        for point in clusters {
            if let Some((x, y)) = pixel_position(point, bounds, width, height) {
                let radius = CLUSTER_BASE_RADIUS + point.count().min(CLUSTER_MAX_GROWTH) as i64;
                fill_disc(&mut canvas, x, y, radius + 2, OUTLINE);
                fill_disc(&mut canvas, x, y, radius, CLUSTER);
            }
        }

        canvas
    }

    fn fill_disc(canvas: &mut RgbaImage, cx: i64, cy: i64, radius: i64, color: Rgba<u8>) {
        let (width, height) = (canvas.width() as i64, canvas.height() as i64);
        for y in (cy - radius).max(0)..=(cy + radius).min(height - 1) {
            for x in (cx - radius).max(0)..=(cx + radius).min(width - 1) {
                let (dx, dy) = (x - cx, y - cy);
                if dx * dx + dy * dy <= radius * radius {
                    canvas.put_pixel(x as u32, y as u32, color);
                }
            }
        }
    }

    pub fn encode_png(canvas: &RgbaImage) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        let encoder = PngEncoder::new(&mut bytes);
        encoder.write_image(canvas.as_raw(), canvas.width(), canvas.height(), ExtendedColorType::Rgba8)?;
        Ok(bytes)
    }

    pub fn save(path: impl AsRef<Path>, canvas: &RgbaImage) -> Result<()> {
        canvas.save(path)?;
        Ok(())
    }
}
