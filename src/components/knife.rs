// ============================================================================
// KNIFE — rectangular selection driving crop and duplicate
// ============================================================================
//
// Idle ──press──▶ Dragging ──release──▶ Committed ──done(Crop)──▶ Idle
//                                          │
//                                          └──done(Duplicate)──▶ Duplicate
//
// In Committed a press inside the rectangle starts a move, a press within
// GRAB_DISTANCE outside it resizes the side the pointer is beyond, and a press
// further away starts a new rectangle. In Duplicate the copied region follows
// the pointer and every press stamps it onto the canvas.
//
// All coordinates are canvas coordinates (overscroll included).

use log::debug;

use crate::canvas::Bitmap;
use crate::project::Project;
use crate::view::View;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum KnifeState {
    #[default]
    Idle,
    Dragging,
    Committed,
    Duplicate,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KnifeMode {
    Crop,
    Duplicate,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
    Top,
    Bottom,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
enum Gesture {
    #[default]
    None,
    Move,
    /// `offset` keeps the distance between the pointer and the grabbed edge.
    Resize { side: Side, offset: i32 },
}

/// Marquee value in the overlay map.
const MARQUEE_ON: u8 = 255;
const MARQUEE_OFF: u8 = 0;

/// How far outside the committed rectangle a press still grabs an edge.
pub const GRAB_DISTANCE: i32 = 8;

#[derive(Debug, Default)]
pub struct Knife {
    state: KnifeState,
    gesture: Gesture,
    begin: (i32, i32),
    last: (i32, i32),
    pointer: (i32, i32),
    floating: Option<Bitmap>,
}

fn inbox(x: i32, y: i32, (x1, y1): (i32, i32), (x2, y2): (i32, i32)) -> bool {
    let (x1, x2) = (x1.min(x2), x1.max(x2));
    let (y1, y2) = (y1.min(y2), y1.max(y2));
    x >= x1 && x <= x2 && y >= y1 && y <= y2
}

/// Within `GRAB_DISTANCE` of the rectangle on both axes.
fn near_rect(x: i32, y: i32, (x1, y1): (i32, i32), (x2, y2): (i32, i32)) -> bool {
    let dx = (x1.min(x2) - x).max(x - x1.max(x2)).max(0);
    let dy = (y1.min(y2) - y).max(y - y1.max(y2)).max(0);
    dx <= GRAB_DISTANCE && dy <= GRAB_DISTANCE
}

/// Order the corners and clamp them into the clip rectangle.
fn absrect(bmp: &Bitmap, (x1, y1): (i32, i32), (x2, y2): (i32, i32)) -> ((i32, i32), (i32, i32)) {
    let (x1, x2) = (x1.min(x2), x1.max(x2));
    let (y1, y2) = (y1.min(y2), y1.max(y2));
    (
        (x1.max(bmp.cl()), y1.max(bmp.ct())),
        (x2.min(bmp.cr()), y2.min(bmp.cb())),
    )
}

impl Knife {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> KnifeState {
        self.state
    }

    /// A rectangle is being dragged, edited or used for stamping.
    pub fn is_active(&self) -> bool {
        self.state != KnifeState::Idle
    }

    /// The floating copy while in duplicate mode.
    pub fn floating(&self) -> Option<&Bitmap> {
        self.floating.as_ref()
    }

    pub fn reset(&mut self) {
        self.state = KnifeState::Idle;
        self.gesture = Gesture::None;
        self.floating = None;
    }

    /// Current rectangle as `(x, y, w, h)` in image coordinates (overscroll
    /// removed). `None` while idle.
    pub fn selection(&self, project: &Project) -> Option<(i32, i32, i32, i32)> {
        if self.state == KnifeState::Idle {
            return None;
        }
        let os = project.bmp().overscroll;
        let (x1, y1) = (self.begin.0.min(self.last.0), self.begin.1.min(self.last.1));
        Some((
            x1 - os,
            y1 - os,
            (self.last.0 - self.begin.0).abs() + 1,
            (self.last.1 - self.begin.1).abs() + 1,
        ))
    }

    fn draw_marquee(&self, project: &mut Project, value: u8) {
        let (a, b) = absrect(project.bmp(), self.begin, self.last);
        project.map_mut().rect(a.0, a.1, b.0, b.1, value);
    }

    /// Drop any marquee and start dragging a fresh rectangle at `(x, y)`.
    fn begin_rect(&mut self, project: &mut Project, x: i32, y: i32) {
        project.map_mut().clear(MARQUEE_OFF);
        self.begin = (x, y);
        self.last = (x, y);
        self.gesture = Gesture::None;
        self.state = KnifeState::Dragging;
    }

    // -----------------------------------------------------------------------
    //  Pointer events
    // -----------------------------------------------------------------------

    pub fn press(&mut self, project: &mut Project, x: i32, y: i32) {
        match self.state {
            KnifeState::Idle => self.begin_rect(project, x, y),
            KnifeState::Committed if self.gesture == Gesture::None => {
                if inbox(x, y, self.begin, self.last) {
                    self.gesture = Gesture::Move;
                } else if !near_rect(x, y, self.begin, self.last) {
                    self.begin_rect(project, x, y);
                } else if x < self.begin.0 {
                    self.gesture = Gesture::Resize { side: Side::Left, offset: (x - self.begin.0).abs() };
                } else if x > self.last.0 {
                    self.gesture = Gesture::Resize { side: Side::Right, offset: (x - self.last.0).abs() };
                } else if y < self.begin.1 {
                    self.gesture = Gesture::Resize { side: Side::Top, offset: (y - self.begin.1).abs() };
                } else {
                    self.gesture = Gesture::Resize { side: Side::Bottom, offset: (y - self.last.1).abs() };
                }
            }
            KnifeState::Duplicate => {
                if let Some(floating) = &self.floating {
                    project.push_undo("Stamp Duplicate");
                    let (fw, fh) = (floating.w, floating.h);
                    floating.blit(project.bmp_mut(), 0, 0, x - fw / 2, y - fh / 2, fw, fh);
                }
            }
            _ => {}
        }
        self.pointer = (x, y);
    }

    pub fn drag(&mut self, project: &mut Project, view: &mut dyn View, x: i32, y: i32) {
        match self.state {
            KnifeState::Dragging => {
                self.draw_marquee(project, MARQUEE_OFF);
                self.last = (x, y);
                self.draw_marquee(project, MARQUEE_ON);
            }
            KnifeState::Committed => {
                self.draw_marquee(project, MARQUEE_OFF);
                match self.gesture {
                    Gesture::Move => {
                        let (dx, dy) = (x - self.pointer.0, y - self.pointer.1);
                        let clip = project.bmp().clip();
                        let fits = clip.contains(self.begin.0 + dx, self.begin.1 + dy)
                            && clip.contains(self.last.0 + dx, self.last.1 + dy);
                        if fits {
                            self.begin = (self.begin.0 + dx, self.begin.1 + dy);
                            self.last = (self.last.0 + dx, self.last.1 + dy);
                        }
                    }
                    Gesture::Resize { side, offset } => match side {
                        Side::Left => self.begin.0 = x + offset,
                        Side::Right => self.last.0 = x - offset,
                        Side::Top => self.begin.1 = y + offset,
                        Side::Bottom => self.last.1 = y - offset,
                    },
                    Gesture::None => {}
                }
                self.draw_marquee(project, MARQUEE_ON);
            }
            _ => {}
        }
        self.pointer = (x, y);
        view.request_redraw(false);
    }

    pub fn release(&mut self, project: &mut Project, view: &mut dyn View) {
        if self.state == KnifeState::Dragging {
            self.state = KnifeState::Committed;
        }
        self.gesture = Gesture::None;
        if matches!(self.state, KnifeState::Dragging | KnifeState::Committed) {
            (self.begin, self.last) = absrect(project.bmp(), self.begin, self.last);
            self.draw_marquee(project, MARQUEE_ON);
            if let Some((x, y, w, h)) = self.selection(project) {
                view.show_region(x, y, w, h);
            }
        }
        view.request_redraw(false);
    }

    /// Pointer motion without a button: in duplicate mode the floating
    /// rectangle follows the pointer, centred on it.
    pub fn hover(&mut self, project: &mut Project, view: &mut dyn View, x: i32, y: i32) {
        if self.state != KnifeState::Duplicate {
            return;
        }
        let Some((fw, fh)) = self.floating.as_ref().map(|f| (f.w, f.h)) else {
            return;
        };
        self.draw_marquee(project, MARQUEE_OFF);
        self.begin = (x - fw / 2, y - fh / 2);
        self.last = (self.begin.0 + fw - 1, self.begin.1 + fh - 1);
        self.draw_marquee(project, MARQUEE_ON);
        self.pointer = (x, y);
        view.request_redraw(false);
    }

    // -----------------------------------------------------------------------
    //  Commit
    // -----------------------------------------------------------------------

    pub fn done(&mut self, project: &mut Project, view: &mut dyn View, mode: KnifeMode) {
        if matches!(self.state, KnifeState::Idle | KnifeState::Duplicate) {
            return;
        }
        match mode {
            KnifeMode::Crop => self.crop(project, view),
            KnifeMode::Duplicate => self.duplicate(project, view),
        }
    }

    fn normalized(&mut self, project: &Project) -> (i32, i32, i32, i32) {
        (self.begin, self.last) = absrect(project.bmp(), self.begin, self.last);
        let w = (self.last.0 - self.begin.0 + 1).max(1);
        let h = (self.last.1 - self.begin.1 + 1).max(1);
        (self.begin.0, self.begin.1, w, h)
    }

    /// Replace the image with exactly the selected rectangle.
    fn crop(&mut self, project: &mut Project, view: &mut dyn View) {
        project.push_undo("Crop");
        let (x, y, w, h) = self.normalized(project);
        debug!("knife: crop to {w}x{h} at ({x}, {y})");

        let region = project.bmp().copy_region(x, y, w, h);
        project.new_image(w, h);
        let os = project.bmp().overscroll;
        region.blit(project.bmp_mut(), 0, 0, os, os, w, h);

        self.reset();
        view.reset_view();
        view.request_redraw(true);
    }

    /// Lift a copy of the rectangle for stamping.
    fn duplicate(&mut self, project: &mut Project, view: &mut dyn View) {
        project.push_undo("Duplicate");
        let (x, y, w, h) = self.normalized(project);
        debug!("knife: duplicate {w}x{h} from ({x}, {y})");
        self.floating = Some(project.bmp().copy_region(x, y, w, h));
        self.state = KnifeState::Duplicate;
        view.request_redraw(false);
    }
}
