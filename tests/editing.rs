use pretty_assertions::assert_eq;

use rasterkit::blend::{get_a, get_b, get_g, get_r, make_rgb};
use rasterkit::components::history::History;
use rasterkit::components::knife::{Knife, KnifeMode};
use rasterkit::ops::transform::{self, Outcome};
use rasterkit::settings::EngineSettings;
use rasterkit::view::{CancelAt, LogProgress, NullView};
use rasterkit::{Bitmap, Project};

const A: u32 = make_rgb(200, 30, 30);
const B: u32 = make_rgb(30, 200, 30);
const C: u32 = make_rgb(30, 30, 200);

fn settings(overscroll: i32) -> EngineSettings {
    EngineSettings { overscroll, progress_interval: 4, ..Default::default() }
}

/// Every image pixel gets a distinct colour.
fn numbered_project(w: i32, h: i32, overscroll: i32) -> Project {
    let mut project = Project::new_untitled(1, w, h, settings(overscroll));
    for y in 0..h {
        for x in 0..w {
            let c = make_rgb((x * 13) as u8, (y * 17) as u8, ((x + y) * 7) as u8);
            project.bmp_mut().setpixel_raw(x + overscroll, y + overscroll, c);
        }
    }
    project
}

// ============================================================================
// Flood fill
// ============================================================================

#[test]
fn fill_replaces_exactly_the_enclosed_square() {
    let mut bmp = Bitmap::new(10, 10);
    bmp.clear(A);
    bmp.rectfill(2, 2, 5, 5, B, 0);

    let old = bmp.getpixel(3, 3);
    let stats = bmp.fill(3, 3, C, old, 0);
    assert_eq!(stats.filled, 16);
    assert!(!stats.truncated);

    for y in 0..10 {
        for x in 0..10 {
            let inside = (2..=5).contains(&x) && (2..=5).contains(&y);
            assert_eq!(bmp.getpixel(x, y), if inside { C } else { A }, "pixel ({x}, {y})");
        }
    }
}

#[test]
fn project_fill_can_be_undone() {
    let mut project = Project::new_untitled(1, 10, 10, settings(4));
    let mut view = NullView::default();
    project.bmp_mut().clear(A);
    let before = project.bmp().clone();

    let stats = transform::fill_image(&mut project, &mut view, 0, 0, C, 0);
    assert_eq!(stats.filled, 100);
    // the margin is outside the clip and stays untouched
    assert_eq!(project.bmp().getpixel(4, 4), C);
    assert_eq!(project.bmp().data()[0], A);

    assert!(project.undo(&mut view));
    assert_eq!(project.bmp(), &before);
}

// ============================================================================
// History
// ============================================================================

#[test]
fn push_pop_and_redo_restore_contents() {
    let mut history = History::default();
    let mut bmp = Bitmap::new(4, 4);
    bmp.clear(A);
    let pre_push = bmp.clone();

    history.push(&bmp);
    bmp.rectfill(1, 1, 2, 2, B, 0);
    let post_push = bmp.clone();

    bmp = history.undo(&bmp).unwrap();
    assert_eq!(bmp, pre_push);

    bmp = history.redo(&bmp).unwrap();
    assert_eq!(bmp, post_push);
}

#[test]
fn oldest_of_eleven_pushes_is_lost() {
    let mut history = History::default();
    let state = |i: u8| {
        let mut bmp = Bitmap::new(2, 2);
        bmp.clear(make_rgb(i, 0, 0));
        bmp
    };

    for i in 0..11 {
        history.push(&state(i));
    }

    let mut current = state(11);
    let mut seen = Vec::new();
    while let Some(prev) = history.undo(&current) {
        seen.push(get_r(prev.getpixel(0, 0)));
        current = prev;
    }
    assert_eq!(seen, vec![10, 9, 8, 7, 6, 5, 4, 3, 2, 1]);
}

#[test]
fn transforms_walk_back_through_project_history() {
    let mut project = numbered_project(6, 4, 3);
    let original = project.bmp().clone();
    let mut view = NullView::default();

    transform::rotate_image_90(&mut project, &mut view, true);
    transform::mirror_image(&mut project, &mut view);
    assert_eq!(project.image_size(), (4, 6));
    assert_eq!(project.history.undo_count(), 2);

    assert!(project.undo(&mut view));
    assert!(project.undo(&mut view));
    assert!(!project.undo(&mut view));
    assert_eq!(project.bmp(), &original);
    assert_eq!(project.history.redo_count(), 2);
}

// ============================================================================
// Scale / rotate
// ============================================================================

#[test]
fn uniform_image_scales_to_its_colour() {
    let mut project = Project::new_untitled(1, 9, 7, settings(2));
    let mut view = NullView::default();
    let colour = make_rgb(17, 128, 250);
    project.bmp_mut().rectfill(2, 2, 10, 8, colour, 0);

    let outcome =
        transform::scale_image(&mut project, &mut view, &mut LogProgress::default(), 1, 1, false).unwrap();
    assert_eq!(outcome, Outcome::Applied);
    assert_eq!(project.image_size(), (1, 1));

    let p = project.bmp().getpixel(2, 2);
    let close = |a: u8, b: u8| (a as i32 - b as i32).abs() <= 1;
    assert!(close(get_r(p), 17) && close(get_g(p), 128) && close(get_b(p), 250), "{p:08x}");
    assert_eq!(get_a(p), 255);
}

#[test]
fn cancelled_rotate_changes_nothing() {
    let mut project = numbered_project(16, 16, 4);
    let before = project.bmp().clone();
    let mut view = NullView::default();
    let outcome =
        transform::rotate_image(&mut project, &mut view, &mut CancelAt::new(1), 30.0, 1.0, false).unwrap();
    assert_eq!(outcome, Outcome::Cancelled);
    assert_eq!(project.bmp(), &before);
    assert!(!project.history.can_undo());
}

// ============================================================================
// Knife
// ============================================================================

#[test]
fn crop_to_full_clip_is_identity() {
    let mut project = numbered_project(12, 9, 6);
    let before = project.bmp().clone();
    let clip = before.clip();
    let mut view = NullView::default();

    let mut knife = Knife::new();
    knife.press(&mut project, clip.left, clip.top);
    knife.drag(&mut project, &mut view, clip.right, clip.bottom);
    knife.release(&mut project, &mut view);
    assert_eq!(knife.selection(&project), Some((0, 0, 12, 9)));
    knife.done(&mut project, &mut view, KnifeMode::Crop);

    assert_eq!(project.bmp().overscroll, 6);
    assert_eq!(project.bmp().data(), before.data());
    assert!(project.history.can_undo());
}

#[test]
fn crop_overshooting_drag_is_clamped() {
    let mut project = numbered_project(8, 8, 2);
    let expected = project.bmp().getpixel(2 + 5, 2 + 6);
    let mut view = NullView::default();

    let mut knife = Knife::new();
    knife.press(&mut project, 2 + 5, 2 + 6);
    knife.drag(&mut project, &mut view, 100, 100);
    knife.release(&mut project, &mut view);
    knife.done(&mut project, &mut view, KnifeMode::Crop);

    assert_eq!(project.image_size(), (3, 2));
    assert_eq!(project.bmp().getpixel(2, 2), expected);
}
