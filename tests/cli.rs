use std::path::PathBuf;

use pretty_assertions::assert_eq;

use rasterkit::blend::{make_rgb, make_rgba};
use rasterkit::canvas::CanvasStyle;
use rasterkit::cli::{Op, run_one};
use rasterkit::io::{load_bitmap, save_bitmap};
use rasterkit::settings::EngineSettings;
use rasterkit::{Bitmap, EngineError};

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("rasterkit-cli-{}-{}", std::process::id(), name))
}

/// 3×2 image, every pixel distinct and opaque.
fn write_input(name: &str) -> PathBuf {
    let path = temp_path(name);
    let mut bmp = Bitmap::new(3, 2);
    for y in 0..2 {
        for x in 0..3 {
            bmp.setpixel_raw(x, y, make_rgb(x as u8 * 80, y as u8 * 120, 10));
        }
    }
    save_bitmap(&bmp, &path, 90).unwrap();
    path
}

fn read_back(path: &PathBuf) -> Bitmap {
    load_bitmap(path, 0, &CanvasStyle::default()).unwrap()
}

#[test]
fn ops_apply_in_order() {
    let input = write_input("order-in.png");
    let output = temp_path("order-out.png");
    let settings = EngineSettings { overscroll: 5, ..Default::default() };
    let ops: Vec<Op> = ["rotate90", "invert"].iter().map(|s| s.parse().unwrap()).collect();

    run_one(&input, &output, &ops, 0, 90, &settings).unwrap();
    let out = read_back(&output);

    assert_eq!((out.w, out.h), (2, 3));
    // clockwise: the bottom-left source pixel becomes the top-left
    assert_eq!(out.getpixel(0, 0), make_rgba(255, 255 - 120, 255 - 10, 255));
    assert_eq!(out.getpixel(1, 0), make_rgba(255, 255, 255 - 10, 255));

    let _ = std::fs::remove_file(&input);
    let _ = std::fs::remove_file(&output);
}

#[test]
fn undo_steps_back_after_ops() {
    let input = write_input("undo-in.png");
    let output = temp_path("undo-out.png");
    let settings = EngineSettings { overscroll: 3, ..Default::default() };
    let ops: Vec<Op> = ["flip-h", "scale=6x4"].iter().map(|s| s.parse().unwrap()).collect();

    run_one(&input, &output, &ops, 1, 90, &settings).unwrap();
    let out = read_back(&output);

    assert_eq!((out.w, out.h), (3, 2));
    assert_eq!(out.getpixel(0, 0), make_rgb(160, 0, 10));
    assert_eq!(out.getpixel(2, 1), make_rgb(0, 120, 10));

    let _ = std::fs::remove_file(&input);
    let _ = std::fs::remove_file(&output);
}

#[test]
fn oversize_scale_is_reported() {
    let input = write_input("big-in.png");
    let output = temp_path("big-out.png");
    let settings = EngineSettings { max_image_size: 100, ..Default::default() };
    let ops = vec!["scale=500x10".parse::<Op>().unwrap()];

    let err = run_one(&input, &output, &ops, 0, 90, &settings).unwrap_err();
    assert!(matches!(err, EngineError::TooLarge { width: 500, height: 10, limit: 100 }));
    assert!(!output.exists());

    let _ = std::fs::remove_file(&input);
}
