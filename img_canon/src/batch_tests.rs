//! End-to-end batch scenarios over real files in a temp directory.

#[cfg(test)]
mod conversion_batch_tests {
    use crate::config::{CanonConfig, CollisionPolicy};
    use crate::formats::tga;
    use crate::image_handle::{ImageHandle, PixelMode};
    use crate::orchestrator::{convert_directory, convert_inputs};
    use image::codecs::gif::GifEncoder;
    use image::{DynamicImage, Frame, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
    use rayon::ThreadPool;
    use shared_utils::thread_manager::build_thread_pool;
    use std::fs;
    use std::path::Path;
    use std::sync::atomic::AtomicBool;
    use tempfile::TempDir;

    fn pool() -> ThreadPool {
        build_thread_pool(2).expect("Failed to build pool")
    }

    fn quiet() -> CanonConfig {
        CanonConfig::new().with_progress(false)
    }

    fn write_opaque_bmp(path: &Path) {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(6, 4, Rgb([90, 120, 30])))
            .save_with_format(path, ImageFormat::Bmp)
            .expect("Failed to write bmp");
    }

    /// Palette GIF whose transparent index is used by one pixel.
    fn write_transparent_gif(path: &Path) {
        let mut img = RgbaImage::from_pixel(4, 4, Rgba([200, 10, 10, 255]));
        img.put_pixel(1, 1, Rgba([0, 0, 0, 0]));
        let file = fs::File::create(path).expect("Failed to create gif");
        let mut encoder = GifEncoder::new(file);
        encoder
            .encode_frame(Frame::new(img))
            .expect("Failed to encode gif");
    }

    #[test]
    fn test_mixed_directory_is_normalized() {
        let dir = TempDir::new().unwrap();
        let bmp = dir.path().join("x.bmp");
        let gif = dir.path().join("y.gif");
        write_opaque_bmp(&bmp);
        write_transparent_gif(&gif);

        let report = convert_directory(dir.path(), &quiet(), &pool(), &AtomicBool::new(false));

        assert_eq!(report.total, 2);
        assert_eq!(report.converted, 2);
        assert!(report.unreadable.is_empty());
        assert!(report.collided.is_empty());
        assert_eq!(report.deleted, vec![bmp.clone(), gif.clone()]);
        assert!(!bmp.exists());
        assert!(!gif.exists());

        let png = ImageHandle::open(&dir.path().join("x.png")).unwrap();
        assert_eq!(png.mode, PixelMode::Rgb);

        let tga_path = dir.path().join("y.tga");
        let tga_handle = ImageHandle::open(&tga_path).unwrap();
        assert_eq!(tga_handle.mode, PixelMode::Rgba);
        assert!(tga::is_rle(&fs::read(&tga_path).unwrap()));
        assert_eq!(tga_handle.image.to_rgba8().get_pixel(1, 1)[3], 0);
    }

    #[test]
    fn test_second_run_skips_everything() {
        let dir = TempDir::new().unwrap();
        write_opaque_bmp(&dir.path().join("x.bmp"));
        write_transparent_gif(&dir.path().join("y.gif"));

        let pool = pool();
        let cancel = AtomicBool::new(false);
        convert_directory(dir.path(), &quiet(), &pool, &cancel);
        let png_before = fs::read(dir.path().join("x.png")).unwrap();
        let tga_before = fs::read(dir.path().join("y.tga")).unwrap();

        let report = convert_directory(dir.path(), &quiet(), &pool, &cancel);

        assert_eq!(report.total, 2);
        assert_eq!(report.skipped, 2);
        assert_eq!(report.converted, 0);
        assert!(report.deleted.is_empty());
        assert_eq!(fs::read(dir.path().join("x.png")).unwrap(), png_before);
        assert_eq!(fs::read(dir.path().join("y.tga")).unwrap(), tga_before);
    }

    #[test]
    fn test_collision_leaves_both_files_untouched() {
        let dir = TempDir::new().unwrap();
        let bmp = dir.path().join("foo.bmp");
        let png = dir.path().join("foo.png");
        write_opaque_bmp(&bmp);
        DynamicImage::ImageRgb8(RgbImage::from_pixel(3, 3, Rgb([1, 2, 3])))
            .save_with_format(&png, ImageFormat::Png)
            .unwrap();
        let bmp_before = fs::read(&bmp).unwrap();
        let png_before = fs::read(&png).unwrap();

        let report = convert_directory(dir.path(), &quiet(), &pool(), &AtomicBool::new(false));

        assert_eq!(report.collided.len(), 1);
        assert_eq!(report.collided[0].source, bmp);
        assert_eq!(report.collided[0].existing, png);
        assert_eq!(report.skipped, 1);
        assert!(report.deleted.is_empty());
        assert_eq!(fs::read(&bmp).unwrap(), bmp_before);
        assert_eq!(fs::read(&png).unwrap(), png_before);
    }

    #[test]
    fn test_overwrite_policy_replaces_and_deletes() {
        let dir = TempDir::new().unwrap();
        let bmp = dir.path().join("foo.bmp");
        let png = dir.path().join("foo.png");
        write_opaque_bmp(&bmp);
        fs::write(&png, b"placeholder, not an image").unwrap();

        let config = quiet().with_collision_policy(CollisionPolicy::Overwrite);
        let report = convert_directory(dir.path(), &config, &pool(), &AtomicBool::new(false));

        assert_eq!(report.converted, 1);
        assert!(report.unreadable.is_empty(), "the overwritten file now holds a valid image");
        assert_eq!(report.deleted, vec![bmp.clone()]);
        let out = image::open(&png).unwrap();
        assert_eq!((out.width(), out.height()), (6, 4));
    }

    #[test]
    fn test_garbage_is_unreadable_and_kept() {
        let dir = TempDir::new().unwrap();
        let bad = dir.path().join("bad.png");
        fs::write(&bad, b"definitely not an image").unwrap();

        let report = convert_directory(dir.path(), &quiet(), &pool(), &AtomicBool::new(false));

        assert_eq!(report.unreadable, vec![bad.clone()]);
        assert_eq!(report.converted, 0);
        assert_eq!(fs::read(&bad).unwrap(), b"definitely not an image");
    }

    #[test]
    fn test_cancelled_batch_touches_nothing() {
        let dir = TempDir::new().unwrap();
        let bmp = dir.path().join("x.bmp");
        write_opaque_bmp(&bmp);

        let report = convert_directory(dir.path(), &quiet(), &pool(), &AtomicBool::new(true));

        assert_eq!(report.cancelled, 1);
        assert_eq!(report.converted, 0);
        assert!(bmp.exists());
        assert!(!dir.path().join("x.png").exists());
    }

    #[test]
    fn test_non_recursive_ignores_subdirectories() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("nested");
        fs::create_dir(&nested).unwrap();
        write_opaque_bmp(&nested.join("deep.bmp"));

        let config = quiet().with_recursive(false);
        let report = convert_directory(dir.path(), &config, &pool(), &AtomicBool::new(false));

        assert_eq!(report.total, 0);
        assert!(nested.join("deep.bmp").exists());
    }

    #[test]
    fn test_explicit_file_input() {
        let dir = TempDir::new().unwrap();
        let one = dir.path().join("one.bmp");
        let two = dir.path().join("two.bmp");
        write_opaque_bmp(&one);
        write_opaque_bmp(&two);

        let report = convert_inputs(&[one.clone()], &quiet(), &pool(), &AtomicBool::new(false));

        assert_eq!(report.converted, 1);
        assert!(dir.path().join("one.png").exists());
        assert!(two.exists());
        assert!(!dir.path().join("two.png").exists());
    }

    #[test]
    fn test_same_stem_sources_never_share_an_output() {
        let dir = TempDir::new().unwrap();
        let pairs = 200u8;
        for i in 0..pairs {
            DynamicImage::ImageRgb8(RgbImage::from_pixel(3, 3, Rgb([i, 1, 0])))
                .save_with_format(dir.path().join(format!("t{}.bmp", i)), ImageFormat::Bmp)
                .unwrap();
            DynamicImage::ImageRgb8(RgbImage::from_pixel(3, 3, Rgb([i, 2, 0])))
                .save_with_format(dir.path().join(format!("t{}.tiff", i)), ImageFormat::Tiff)
                .unwrap();
        }

        let pool = build_thread_pool(8).expect("Failed to build pool");
        let report = convert_directory(dir.path(), &quiet(), &pool, &AtomicBool::new(false));

        assert_eq!(report.converted, pairs as usize);
        assert_eq!(report.collided.len(), pairs as usize);
        assert_eq!(report.deleted.len(), pairs as usize);
        assert!(report.write_failed.is_empty());

        for i in 0..pairs {
            let bmp = dir.path().join(format!("t{}.bmp", i));
            let tiff = dir.path().join(format!("t{}.tiff", i));
            assert!(
                bmp.exists() != tiff.exists(),
                "exactly one source of pair {} must remain",
                i
            );

            // the output holds the pixels of the source that was deleted
            let out = image::open(dir.path().join(format!("t{}.png", i))).unwrap().to_rgb8();
            let expected = if bmp.exists() { Rgb([i, 2, 0]) } else { Rgb([i, 1, 0]) };
            assert_eq!(out.get_pixel(0, 0), &expected);
        }
    }
}
