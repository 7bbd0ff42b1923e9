//! Test fixtures: a writer for small ISO 9660 images.
//!
//! Only what the installer's tests need: a primary volume descriptor, both
//! path tables, directories that fit in one extent each, and contiguous file
//! extents. Names are written as given (files get a `;1` suffix) without
//! Rock Ridge or Joliet extensions.

use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::Path;

const SECTOR: usize = 2048;
const FIRST_FREE_SECTOR: usize = 20;
const RECORD_DATE: [u8; 7] = [124, 1, 1, 0, 0, 0, 0];
const VOLUME_DATE: &[u8; 17] = b"2024010100000000\0";

#[derive(Debug, Clone, Default)]
pub struct IsoBuilder {
    dirs: BTreeSet<String>,
    files: BTreeMap<String, Vec<u8>>,
}

fn clean(path: &str) -> String {
    path.split('/')
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

fn parent_of(path: &str) -> &str {
    path.rsplit_once('/').map_or("", |(parent, _)| parent)
}

fn name_of(path: &str) -> &str {
    path.rsplit_once('/').map_or(path, |(_, name)| name)
}

fn both16(v: u16) -> [u8; 4] {
    let (le, be) = (v.to_le_bytes(), v.to_be_bytes());
    [le[0], le[1], be[0], be[1]]
}

fn both32(v: u32) -> [u8; 8] {
    let (le, be) = (v.to_le_bytes(), v.to_be_bytes());
    [le[0], le[1], le[2], le[3], be[0], be[1], be[2], be[3]]
}

fn dir_record(identifier: &[u8], extent: usize, size: usize, is_dir: bool) -> Vec<u8> {
    let pad = usize::from(identifier.len() % 2 == 0);
    let len = 33 + identifier.len() + pad;
    let mut rec = Vec::with_capacity(len);
    rec.push(len as u8);
    rec.push(0);
    rec.extend_from_slice(&both32(extent as u32));
    rec.extend_from_slice(&both32(size as u32));
    rec.extend_from_slice(&RECORD_DATE);
    rec.push(if is_dir { 0x02 } else { 0x00 });
    rec.push(0);
    rec.push(0);
    rec.extend_from_slice(&both16(1));
    rec.push(identifier.len() as u8);
    rec.extend_from_slice(identifier);
    rec.resize(len, 0);
    rec
}

fn sectors_for(len: usize) -> usize {
    len.div_ceil(SECTOR)
}

/// Lay records out so none crosses a sector boundary.
fn pack(records: &[Vec<u8>]) -> Vec<u8> {
    let mut out = Vec::new();
    for rec in records {
        let used = out.len() % SECTOR;
        if used + rec.len() > SECTOR {
            out.resize(out.len() + SECTOR - used, 0);
        }
        out.extend_from_slice(rec);
    }
    out.resize(sectors_for(out.len()).max(1) * SECTOR, 0);
    out
}

fn padded(text: &str, len: usize) -> Vec<u8> {
    let mut v = text.as_bytes().to_vec();
    v.resize(len, b' ');
    v
}

impl IsoBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn add_parents(&mut self, path: &str) {
        let mut dir = parent_of(path).to_owned();
        while !dir.is_empty() {
            let next = parent_of(&dir).to_owned();
            self.dirs.insert(dir);
            dir = next;
        }
    }

    #[must_use]
    pub fn file(mut self, path: &str, contents: impl Into<Vec<u8>>) -> Self {
        let path = clean(path);
        self.add_parents(&path);
        self.files.insert(path, contents.into());
        self
    }

    #[must_use]
    pub fn dir(mut self, path: &str) -> Self {
        let path = clean(path);
        self.add_parents(&path);
        self.dirs.insert(path);
        self
    }

    /// Directories in path-table order: breadth first, children sorted.
    fn dir_order(&self) -> Vec<String> {
        let mut order = vec![String::new()];
        let mut i = 0;
        while i < order.len() {
            let parent = order[i].clone();
            order.extend(
                self.dirs
                    .iter()
                    .filter(|d| parent_of(d) == parent)
                    .cloned(),
            );
            i += 1;
        }
        order
    }

    /// Children of `dir` as (identifier, path, is_dir), sorted by identifier.
    fn children(&self, dir: &str) -> Vec<(Vec<u8>, String, bool)> {
        let mut out: Vec<_> = self
            .dirs
            .iter()
            .filter(|d| parent_of(d) == dir)
            .map(|d| (name_of(d).as_bytes().to_vec(), d.clone(), true))
            .chain(
                self.files
                    .keys()
                    .filter(|f| parent_of(f) == dir)
                    .map(|f| (format!("{};1", name_of(f)).into_bytes(), f.clone(), false)),
            )
            .collect();
        out.sort();
        out
    }

    fn dir_extent(&self, dir: &str, loc: &BTreeMap<String, (usize, usize)>) -> Vec<u8> {
        let (self_at, self_size) = loc[dir];
        let (parent_at, parent_size) = loc[parent_of(dir)];
        let mut records = vec![
            dir_record(&[0], self_at, self_size, true),
            dir_record(&[1], parent_at, parent_size, true),
        ];
        for (id, path, is_dir) in self.children(dir) {
            let (at, size) = loc[&path];
            records.push(dir_record(&id, at, size, is_dir));
        }
        pack(&records)
    }

    fn path_table(order: &[String], loc: &BTreeMap<String, (usize, usize)>, big_endian: bool) -> Vec<u8> {
        let number: BTreeMap<&str, u16> = order
            .iter()
            .enumerate()
            .map(|(i, d)| (d.as_str(), (i + 1) as u16))
            .collect();
        let mut out = Vec::new();
        for dir in order {
            let id: &[u8] = if dir.is_empty() { &[0] } else { name_of(dir).as_bytes() };
            let at = loc[dir].0 as u32;
            let parent = number[parent_of(dir)];
            out.push(id.len() as u8);
            out.push(0);
            if big_endian {
                out.extend_from_slice(&at.to_be_bytes());
                out.extend_from_slice(&parent.to_be_bytes());
            } else {
                out.extend_from_slice(&at.to_le_bytes());
                out.extend_from_slice(&parent.to_le_bytes());
            }
            out.extend_from_slice(id);
            if id.len() % 2 == 1 {
                out.push(0);
            }
        }
        out
    }

    pub fn build(&self) -> Vec<u8> {
        let order = self.dir_order();

        // Extent sizes do not depend on locations, so size first, place second.
        let mut loc: BTreeMap<String, (usize, usize)> = BTreeMap::new();
        let mut next = FIRST_FREE_SECTOR;
        for dir in &order {
            let records: Vec<Vec<u8>> = [vec![0u8], vec![1u8]]
                .into_iter()
                .chain(self.children(dir).into_iter().map(|(id, _, _)| id))
                .map(|id| dir_record(&id, 0, 0, true))
                .collect();
            let size = pack(&records).len();
            loc.insert(dir.clone(), (next, size));
            next += size / SECTOR;
        }
        for (path, data) in &self.files {
            loc.insert(path.clone(), (next, data.len()));
            next += sectors_for(data.len());
        }
        let total = next;

        let mut image = vec![0u8; total * SECTOR];
        for dir in &order {
            let (at, _) = loc[dir];
            let extent = self.dir_extent(dir, &loc);
            image[at * SECTOR..at * SECTOR + extent.len()].copy_from_slice(&extent);
        }
        for (path, data) in &self.files {
            let (at, _) = loc[path];
            image[at * SECTOR..at * SECTOR + data.len()].copy_from_slice(data);
        }

        let l_table = Self::path_table(&order, &loc, false);
        let m_table = Self::path_table(&order, &loc, true);
        image[18 * SECTOR..18 * SECTOR + l_table.len()].copy_from_slice(&l_table);
        image[19 * SECTOR..19 * SECTOR + m_table.len()].copy_from_slice(&m_table);

        let (root_at, root_size) = loc[""];
        let mut pvd = vec![0u8; SECTOR];
        pvd[0] = 1;
        pvd[1..6].copy_from_slice(b"CD001");
        pvd[6] = 1;
        pvd[8..40].copy_from_slice(&padded("LINUX", 32));
        pvd[40..72].copy_from_slice(&padded("HOUDINI", 32));
        pvd[80..88].copy_from_slice(&both32(total as u32));
        pvd[120..124].copy_from_slice(&both16(1));
        pvd[124..128].copy_from_slice(&both16(1));
        pvd[128..132].copy_from_slice(&both16(SECTOR as u16));
        pvd[132..140].copy_from_slice(&both32(l_table.len() as u32));
        pvd[140..144].copy_from_slice(&18u32.to_le_bytes());
        pvd[148..152].copy_from_slice(&19u32.to_be_bytes());
        pvd[156..190].copy_from_slice(&dir_record(&[0], root_at, root_size, true));
        for (start, len) in [(190, 128), (318, 128), (446, 128), (574, 128), (702, 37), (739, 37), (776, 37)] {
            pvd[start..start + len].copy_from_slice(&padded("", len));
        }
        for start in [813, 830, 847, 864] {
            pvd[start..start + 17].copy_from_slice(VOLUME_DATE);
        }
        pvd[881] = 1;
        image[16 * SECTOR..17 * SECTOR].copy_from_slice(&pvd);

        let terminator = &mut image[17 * SECTOR..18 * SECTOR];
        terminator[0] = 255;
        terminator[1..6].copy_from_slice(b"CD001");
        terminator[6] = 1;

        image
    }

    pub fn write(&self, path: &Path) -> io::Result<()> {
        std::fs::write(path, self.build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn volume_descriptors_are_in_place() {
        let image = IsoBuilder::new().file("data/overview.json", "{}").build();
        assert_eq!(image.len() % SECTOR, 0);
        assert_eq!(&image[16 * SECTOR + 1..16 * SECTOR + 6], b"CD001");
        assert_eq!(image[17 * SECTOR], 255);
    }

    #[test]
    fn directory_records_do_not_cross_sectors() {
        let mut builder = IsoBuilder::new();
        for i in 0..120 {
            builder = builder.file(&format!("data/shfs/file_with_a_long_name_{i:03}.txt"), "x");
        }
        let image = builder.build();
        assert!(image.len() > 24 * SECTOR);
    }
}
