//! Gallery items and the photo lightbox state machine.
//!
//! The lightbox is either closed or open at an index into the photo
//! sequence. Next/prev wrap around; no transition exists over an empty
//! sequence. Swipe direction is inferred from a signed horizontal pixel
//! delta against a fixed threshold.

use serde::Deserialize;

/// Horizontal travel below this many pixels is not a swipe.
pub const SWIPE_THRESHOLD_PX: i32 = 50;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Photo {
    pub id: u32,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub image: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Video {
    pub id: u32,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "videoId")]
    pub video_id: String,
    #[serde(default)]
    pub thumbnail: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightboxState {
    Closed,
    Open(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwipeDirection {
    Next,
    Prev,
}

impl SwipeDirection {
    /// Direction of a completed horizontal gesture, or `None` when the
    /// travel stays under the threshold. Leftward travel advances.
    pub fn from_travel(start_x: i32, end_x: i32) -> Option<Self> {
        let diff = start_x - end_x;
        if diff.abs() <= SWIPE_THRESHOLD_PX {
            return None;
        }
        if diff > 0 {
            Some(SwipeDirection::Next)
        } else {
            Some(SwipeDirection::Prev)
        }
    }
}

/// Photo viewer over an ordered sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct Lightbox {
    photos: Vec<Photo>,
    state: LightboxState,
}

impl Lightbox {
    pub fn new(photos: Vec<Photo>) -> Self {
        Self {
            photos,
            state: LightboxState::Closed,
        }
    }

    pub fn state(&self) -> LightboxState {
        self.state
    }

    pub fn photos(&self) -> &[Photo] {
        &self.photos
    }

    pub fn is_empty(&self) -> bool {
        self.photos.is_empty()
    }

    pub fn current(&self) -> Option<&Photo> {
        match self.state {
            LightboxState::Open(index) => self.photos.get(index),
            LightboxState::Closed => None,
        }
    }

    /// Open at the photo with the given id, resolved by linear lookup.
    /// An unknown id (or an empty sequence) leaves the state unchanged.
    pub fn open(&mut self, id: u32) -> bool {
        match self.photos.iter().position(|photo| photo.id == id) {
            Some(index) => {
                self.state = LightboxState::Open(index);
                true
            }
            None => false,
        }
    }

    pub fn close(&mut self) {
        self.state = LightboxState::Closed;
    }

    pub fn next(&mut self) {
        self.step(1);
    }

    pub fn prev(&mut self) {
        self.step(-1);
    }

    pub fn swipe(&mut self, start_x: i32, end_x: i32) {
        match SwipeDirection::from_travel(start_x, end_x) {
            Some(SwipeDirection::Next) => self.next(),
            Some(SwipeDirection::Prev) => self.prev(),
            None => {}
        }
    }

    fn step(&mut self, direction: isize) {
        let LightboxState::Open(index) = self.state else {
            return;
        };
        if let Some(next) = self.wrapped(index, direction) {
            self.state = LightboxState::Open(next);
        }
    }

    /// Wrap-around neighbor indices `(prev, next)` for a photo position,
    /// used to precompute navigation targets when rendering the grid.
    pub fn neighbors_of(&self, index: usize) -> Option<(usize, usize)> {
        if index >= self.photos.len() {
            return None;
        }
        let prev = self.wrapped(index, -1)?;
        let next = self.wrapped(index, 1)?;
        Some((prev, next))
    }

    fn wrapped(&self, index: usize, direction: isize) -> Option<usize> {
        let len = self.photos.len();
        if len == 0 {
            return None;
        }
        let len = len as isize;
        let raw = index as isize + direction;
        Some(raw.rem_euclid(len) as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn photo(id: u32, title: &str) -> Photo {
        Photo {
            id,
            title: title.to_string(),
            description: String::new(),
            image: format!("images/gallery/{id}.jpg"),
        }
    }

    fn abc() -> Lightbox {
        Lightbox::new(vec![photo(1, "A"), photo(2, "B"), photo(3, "C")])
    }

    #[test]
    fn open_resolves_id_then_navigation_wraps() {
        let mut lightbox = abc();
        assert!(lightbox.open(2));
        assert_eq!(lightbox.current().map(|p| p.title.as_str()), Some("B"));

        lightbox.next();
        assert_eq!(lightbox.current().map(|p| p.title.as_str()), Some("C"));

        lightbox.next();
        assert_eq!(lightbox.current().map(|p| p.title.as_str()), Some("A"));

        lightbox.prev();
        assert_eq!(lightbox.current().map(|p| p.title.as_str()), Some("C"));
    }

    #[test]
    fn unknown_id_is_a_no_op() {
        let mut lightbox = abc();
        assert!(!lightbox.open(99));
        assert_eq!(lightbox.state(), LightboxState::Closed);
    }

    #[test]
    fn empty_sequence_admits_no_transition() {
        let mut lightbox = Lightbox::new(Vec::new());
        assert!(!lightbox.open(1));
        lightbox.next();
        lightbox.prev();
        assert_eq!(lightbox.state(), LightboxState::Closed);
        assert!(lightbox.current().is_none());
    }

    #[test]
    fn close_returns_to_closed() {
        let mut lightbox = abc();
        lightbox.open(1);
        lightbox.close();
        assert_eq!(lightbox.state(), LightboxState::Closed);
        // Navigation from closed does nothing.
        lightbox.next();
        assert_eq!(lightbox.state(), LightboxState::Closed);
    }

    #[test]
    fn swipe_direction_respects_threshold() {
        assert_eq!(SwipeDirection::from_travel(200, 130), Some(SwipeDirection::Next));
        assert_eq!(SwipeDirection::from_travel(130, 200), Some(SwipeDirection::Prev));
        assert_eq!(SwipeDirection::from_travel(200, 160), None);
        assert_eq!(SwipeDirection::from_travel(200, 150), None);
    }

    #[test]
    fn swipe_drives_navigation() {
        let mut lightbox = abc();
        lightbox.open(1);
        lightbox.swipe(300, 100);
        assert_eq!(lightbox.current().map(|p| p.title.as_str()), Some("B"));
        lightbox.swipe(100, 300);
        assert_eq!(lightbox.current().map(|p| p.title.as_str()), Some("A"));
    }

    #[test]
    fn neighbors_precompute_wraparound_targets() {
        let lightbox = abc();
        assert_eq!(lightbox.neighbors_of(0), Some((2, 1)));
        assert_eq!(lightbox.neighbors_of(2), Some((1, 0)));
        assert_eq!(lightbox.neighbors_of(3), None);
    }
}
