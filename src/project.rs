use std::path::PathBuf;

use log::debug;
use uuid::Uuid;

use crate::canvas::Bitmap;
use crate::components::history::History;
use crate::map::Map;
use crate::settings::EngineSettings;
use crate::view::View;

/// Single open document: the working canvas, its overlay map and history.
#[derive(Debug)]
pub struct Project {
    pub id: Uuid,
    /// `None` for unsaved/untitled images.
    pub path: Option<PathBuf>,
    pub is_dirty: bool,

    /// Display name (derived from path or "Untitled-X")
    pub name: String,

    pub history: History,
    settings: EngineSettings,
    bmp: Bitmap,
    map: Map,
}

impl Project {
    pub fn new_untitled(untitled_counter: usize, width: i32, height: i32, settings: EngineSettings) -> Self {
        let bmp = Bitmap::with_overscroll(width, height, settings.overscroll, &settings.style);
        Self::with_canvas(format!("Untitled-{}", untitled_counter), None, bmp, settings)
    }

    /// Wrap an already decoded canvas (see `io::load_bitmap`).
    pub fn from_bitmap(path: PathBuf, bmp: Bitmap, settings: EngineSettings) -> Self {
        let name = path
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "Unknown".to_string());
        Self::with_canvas(name, Some(path), bmp, settings)
    }

    fn with_canvas(name: String, path: Option<PathBuf>, bmp: Bitmap, settings: EngineSettings) -> Self {
        let map = Map::new(bmp.w, bmp.h);
        Self {
            id: Uuid::new_v4(),
            path,
            is_dirty: false,
            name,
            history: History::new(settings.history_depth),
            settings,
            bmp,
            map,
        }
    }

    pub fn bmp(&self) -> &Bitmap {
        &self.bmp
    }

    /// Mutable canvas access; marks the project dirty.
    pub fn bmp_mut(&mut self) -> &mut Bitmap {
        self.is_dirty = true;
        &mut self.bmp
    }

    pub fn map(&self) -> &Map {
        &self.map
    }

    pub fn map_mut(&mut self) -> &mut Map {
        &mut self.map
    }

    /// Canvas and overlay at once, for tools that draw into both.
    pub fn bmp_and_map_mut(&mut self) -> (&mut Bitmap, &mut Map) {
        self.is_dirty = true;
        (&mut self.bmp, &mut self.map)
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Margin used for newly built canvases.
    pub fn overscroll(&self) -> i32 {
        self.settings.overscroll
    }

    /// Image size without the margin.
    pub fn image_size(&self) -> (i32, i32) {
        (self.bmp.cw(), self.bmp.ch())
    }

    /// Install a freshly built canvas; the overlay map is rebuilt to match.
    pub fn replace_canvas(&mut self, bmp: Bitmap) {
        debug!("project: canvas {}x{} -> {}x{}", self.bmp.w, self.bmp.h, bmp.w, bmp.h);
        self.map = Map::new(bmp.w, bmp.h);
        self.bmp = bmp;
        self.is_dirty = true;
    }

    /// Replace the canvas with a blank `w × h` image.
    pub fn new_image(&mut self, width: i32, height: i32) {
        let bmp = Bitmap::with_overscroll(width, height, self.settings.overscroll, &self.settings.style);
        self.replace_canvas(bmp);
    }

    /// Snapshot the canvas before a destructive operation.
    pub fn push_undo(&mut self, description: &str) {
        self.history.push_labeled(description, &self.bmp);
    }

    /// Restore the newest undo snapshot. `false` when there is none.
    pub fn undo(&mut self, view: &mut dyn View) -> bool {
        let Some(bmp) = self.history.undo(&self.bmp) else {
            return false;
        };
        self.install_restored(bmp, view);
        true
    }

    /// Re-apply the newest undone state. `false` when there is none.
    pub fn redo(&mut self, view: &mut dyn View) -> bool {
        let Some(bmp) = self.history.redo(&self.bmp) else {
            return false;
        };
        self.install_restored(bmp, view);
        true
    }

    fn install_restored(&mut self, bmp: Bitmap, view: &mut dyn View) {
        self.replace_canvas(bmp);
        view.clamp_offset(self.bmp.w, self.bmp.h);
        view.request_redraw(true);
    }

    pub fn mark_clean(&mut self) {
        self.is_dirty = false;
    }

    pub fn update_name_from_path(&mut self) {
        if let Some(ref path) = self.path {
            self.name = path
                .file_name()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| "Unknown".to_string());
        }
    }

    /// Get the display title (name with dirty indicator)
    pub fn display_title(&self) -> String {
        if self.is_dirty {
            format!("{}*", self.name)
        } else {
            self.name.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blend::make_rgb;
    use crate::view::NullView;

    fn settings(overscroll: i32) -> EngineSettings {
        EngineSettings { overscroll, ..Default::default() }
    }

    #[test]
    fn untitled_project_has_margin() {
        let project = Project::new_untitled(3, 20, 10, settings(4));
        assert_eq!(project.name, "Untitled-3");
        assert_eq!(project.image_size(), (20, 10));
        assert_eq!((project.bmp().w, project.bmp().h), (28, 18));
        assert_eq!((project.map().w, project.map().h), (28, 18));
        assert!(!project.is_dirty);
    }

    #[test]
    fn undo_restores_size_and_map() {
        let mut project = Project::new_untitled(1, 8, 8, settings(2));
        let mut view = NullView::default();
        project.push_undo("Resize");
        project.new_image(3, 5);
        assert_eq!(project.image_size(), (3, 5));

        assert!(project.undo(&mut view));
        assert_eq!(project.image_size(), (8, 8));
        assert_eq!((project.map().w, project.map().h), (12, 12));
        assert_eq!(view.full_redraws, 1);

        assert!(project.redo(&mut view));
        assert_eq!(project.image_size(), (3, 5));
        assert!(!project.redo(&mut view));
    }

    #[test]
    fn dirty_title() {
        let mut project = Project::new_untitled(1, 4, 4, settings(0));
        project.bmp_mut().setpixel_raw(0, 0, make_rgb(1, 2, 3));
        assert_eq!(project.display_title(), "Untitled-1*");
        project.mark_clean();
        assert_eq!(project.display_title(), "Untitled-1");
    }
}
