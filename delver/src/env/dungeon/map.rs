use crate::env::EnvError;
use image::{Rgb, RgbImage};
use rand::Rng;

const UNSEEN_WALL: Rgb<u8> = Rgb([40, 40, 40]);
const UNSEEN_FLOOR: Rgb<u8> = Rgb([110, 110, 110]);
const WALL: Rgb<u8> = Rgb([90, 60, 30]);
const FLOOR: Rgb<u8> = Rgb([230, 230, 230]);
const TRAIL: Rgb<u8> = Rgb([120, 170, 230]);
const AGENT: Rgb<u8> = Rgb([220, 40, 40]);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cell {
    Free,
    Occupied,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Room {
    pub x: usize,
    pub y: usize,
    pub w: usize,
    pub h: usize,
}

impl Room {
    pub fn center(&self) -> (usize, usize) {
        (self.x + self.w / 2, self.y + self.h / 2)
    }

    /// Overlap test with a `margin` cell gap required between rooms.
    fn intersects(&self, other: &Room, margin: usize) -> bool {
        self.x < other.x + other.w + margin
            && other.x < self.x + self.w + margin
            && self.y < other.y + other.h + margin
            && other.y < self.y + self.h + margin
    }
}

/// Layout parameters for room placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub width: usize,
    pub height: usize,
    pub max_rooms: usize,
    pub min_room_xy: usize,
    pub max_room_xy: usize,
}

impl Layout {
    pub fn validate(&self) -> Result<(), EnvError> {
        if self.width < 3 || self.height < 3 {
            return Err(EnvError::Config(format!(
                "map must be at least 3x3, got {}x{}",
                self.width, self.height
            )));
        }
        if self.max_rooms == 0 {
            return Err(EnvError::Config("max_rooms must be positive".into()));
        }
        if self.min_room_xy == 0 || self.min_room_xy > self.max_room_xy {
            return Err(EnvError::Config(format!(
                "room size range {}..={} is empty",
                self.min_room_xy, self.max_room_xy
            )));
        }
        if self.min_room_xy > self.width - 2 || self.min_room_xy > self.height - 2 {
            return Err(EnvError::Config(format!(
                "rooms of side {} don't fit in a {}x{} map",
                self.min_room_xy, self.width, self.height
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct Map {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
    explored: Vec<bool>,
    visited: Vec<bool>,
    rooms: Vec<Room>,
    free_cells: u32,
    explored_cells: u32,
    explored_free: u32,
}

impl Map {
    /// Carves up to `max_rooms` non-overlapping rooms out of solid rock and
    /// joins consecutive rooms with L-shaped corridors.
    pub fn generate<R: Rng>(layout: &Layout, rng: &mut R) -> Result<Self, EnvError> {
        layout.validate()?;
        let Layout {
            width,
            height,
            max_rooms,
            min_room_xy,
            max_room_xy,
        } = *layout;
        // Rooms never share cells, so the map bounds how many can be placed.
        let max_rooms = max_rooms.min(width * height);

        let mut map = Self {
            width,
            height,
            cells: vec![Cell::Occupied; width * height],
            explored: vec![false; width * height],
            visited: vec![false; width * height],
            rooms: Vec::with_capacity(max_rooms),
            free_cells: 0,
            explored_cells: 0,
            explored_free: 0,
        };

        let max_w = max_room_xy.min(width - 2);
        let max_h = max_room_xy.min(height - 2);
        let mut attempts = max_rooms.saturating_mul(10);
        while map.rooms.len() < max_rooms && attempts > 0 {
            attempts -= 1;
            let w = rng.gen_range(min_room_xy..=max_w);
            let h = rng.gen_range(min_room_xy..=max_h);
            let room = Room {
                x: rng.gen_range(1..=width - 1 - w),
                y: rng.gen_range(1..=height - 1 - h),
                w,
                h,
            };
            if map.rooms.iter().any(|other| room.intersects(other, 1)) {
                continue;
            }
            map.carve_room(&room);
            if let Some(prev) = map.rooms.last().copied() {
                let (x1, y1) = prev.center();
                let (x2, y2) = room.center();
                if rng.gen_bool(0.5) {
                    map.carve_horizontal(x1, x2, y1);
                    map.carve_vertical(y1, y2, x2);
                } else {
                    map.carve_vertical(y1, y2, x1);
                    map.carve_horizontal(x1, x2, y2);
                }
            }
            map.rooms.push(room);
        }

        map.free_cells = map.cells.iter().filter(|c| **c == Cell::Free).count() as u32;
        Ok(map)
    }

    fn carve_room(&mut self, room: &Room) {
        for y in room.y..room.y + room.h {
            for x in room.x..room.x + room.w {
                self.set(x, y, Cell::Free);
            }
        }
    }

    fn carve_horizontal(&mut self, x1: usize, x2: usize, y: usize) {
        for x in x1.min(x2)..=x1.max(x2) {
            self.set(x, y, Cell::Free);
        }
    }

    fn carve_vertical(&mut self, y1: usize, y2: usize, x: usize) {
        for y in y1.min(y2)..=y1.max(y2) {
            self.set(x, y, Cell::Free);
        }
    }

    fn set(&mut self, x: usize, y: usize, cell: Cell) {
        let idx = self.index(x, y);
        self.cells[idx] = cell;
    }

    fn index(&self, x: usize, y: usize) -> usize {
        y * self.width + x
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn rooms(&self) -> &[Room] {
        &self.rooms
    }

    pub fn in_bounds(&self, x: i64, y: i64) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height
    }

    pub fn cell(&self, x: usize, y: usize) -> Cell {
        self.cells[self.index(x, y)]
    }

    pub fn is_free(&self, x: usize, y: usize) -> bool {
        x < self.width && y < self.height && self.cell(x, y) == Cell::Free
    }

    pub fn is_explored(&self, x: usize, y: usize) -> bool {
        self.explored[self.index(x, y)]
    }

    pub fn is_visited(&self, x: usize, y: usize) -> bool {
        self.visited[self.index(x, y)]
    }

    /// Marks the cell as stood on. Returns true if it was not visited before.
    pub fn visit(&mut self, x: usize, y: usize) -> bool {
        let idx = self.index(x, y);
        !std::mem::replace(&mut self.visited[idx], true)
    }

    pub fn free_cells(&self) -> u32 {
        self.free_cells
    }

    pub fn explored_cells(&self) -> u32 {
        self.explored_cells
    }

    pub fn fully_explored(&self) -> bool {
        self.explored_free >= self.free_cells
    }

    /// Explores every cell within `radius` of `(x, y)` that is in line of
    /// sight. Returns how many cells were explored for the first time.
    pub fn reveal(&mut self, x: usize, y: usize, radius: usize) -> u32 {
        let r = radius as i64;
        let (ox, oy) = (x as i64, y as i64);
        let mut revealed = 0;
        for dy in -r..=r {
            for dx in -r..=r {
                if dx * dx + dy * dy > r * r {
                    continue;
                }
                let (tx, ty) = (ox + dx, oy + dy);
                if !self.in_bounds(tx, ty) || !self.line_of_sight((ox, oy), (tx, ty)) {
                    continue;
                }
                let idx = self.index(tx as usize, ty as usize);
                if !self.explored[idx] {
                    self.explored[idx] = true;
                    self.explored_cells += 1;
                    if self.cells[idx] == Cell::Free {
                        self.explored_free += 1;
                    }
                    revealed += 1;
                }
            }
        }
        revealed
    }

    /// Bresenham walk from `from` to `to`; only the cells strictly between
    /// the endpoints can block.
    fn line_of_sight(&self, from: (i64, i64), to: (i64, i64)) -> bool {
        let (mut x, mut y) = from;
        let dx = (to.0 - x).abs();
        let dy = -(to.1 - y).abs();
        let sx = if x < to.0 { 1 } else { -1 };
        let sy = if y < to.1 { 1 } else { -1 };
        let mut err = dx + dy;
        loop {
            if (x, y) == to {
                return true;
            }
            if (x, y) != from && self.cell(x as usize, y as usize) == Cell::Occupied {
                return false;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }

    /// One pixel per cell.
    pub fn render(&self, agent: Option<(usize, usize)>) -> RgbImage {
        RgbImage::from_fn(self.width as u32, self.height as u32, |px, py| {
            let (x, y) = (px as usize, py as usize);
            if agent == Some((x, y)) {
                return AGENT;
            }
            let idx = self.index(x, y);
            match (self.cells[idx], self.explored[idx]) {
                (Cell::Occupied, false) => UNSEEN_WALL,
                (Cell::Occupied, true) => WALL,
                (Cell::Free, _) if self.visited[idx] => TRAIL,
                (Cell::Free, false) => UNSEEN_FLOOR,
                (Cell::Free, true) => FLOOR,
            }
        })
    }
}
