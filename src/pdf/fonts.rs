//! Font discovery, loading and PDF embedding.
//!
//! Resolution happens in two steps. [`resolve`] only looks at the filesystem and
//! produces a [`FontHandle`]; [`LoadedFont::load`] then reads and parses the file.
//!
//! Supports:
//! - `"auto"`: walks a fixed, ordered list of candidates (a bundled Noto Sans JP
//!   found near the report, then Hiragino on macOS, then Noto CJK on Linux) and
//!   falls back to the PDF base font Helvetica when none of them exist
//! - any other value: an explicit path to a TrueType/OpenType file or collection
//!
//! Embedded fonts are written whole as a Type0 font with Identity-H encoding, so text
//! is shown as two-byte CIDs. For TrueType outlines and name-keyed CFF the CID is the
//! glyph id; CID-keyed CFF fonts (Hiragino, Noto CJK OTFs) map glyph ids back to their
//! CIDs through the CFF charset. Collections (`.ttc`) are reduced to their first face.

use crate::error::{ReportError, Result};
use owned_ttf_parser::{AsFaceRef, GlyphId, OwnedFace};
use pdf_writer::types::{CidFontType, FontFlags, SystemInfo, UnicodeCmap};
use pdf_writer::{Filter, Name, Pdf, Rect, Ref, Str};
use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Sentinel `--font` value that enables the candidate search.
pub const AUTO: &str = "auto";

/// Resource name the font is registered under on every page.
pub const FONT_RESOURCE: &[u8] = b"F1";

const MIN_FONT_FILE_SIZE: u64 = 10_000;
const FONT_MAGICS: &[&[u8]] = &[b"\x00\x01\x00\x00", b"OTTO", b"ttcf", b"true"];

const BUNDLED_FONT: &str = "public/fonts/NotoSansJP-Regular.ttf";
const BUNDLED_SEARCH_DEPTH: usize = 5;

const HIRAGINO_PATHS: &[&str] = &[
    "/System/Library/Fonts/ヒラギノ角ゴシック W3.ttc",
    "/Library/Fonts/ヒラギノ角ゴ ProN W3.otf",
    "/System/Library/Fonts/Hiragino Sans GB W3.otf",
];

const NOTO_PATHS: &[&str] = &[
    "/usr/share/fonts/opentype/noto/NotoSansCJK-Regular.ttc",
    "/usr/share/fonts/truetype/noto/NotoSansJP-Regular.ttf",
];

/// Where the font comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FontSource {
    File(PathBuf),
    /// The standard Helvetica every PDF reader ships; Latin only.
    Builtin,
}

/// A resolved font: where it lives and the family name it is registered as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontHandle {
    pub source: FontSource,
    pub family: String,
}

impl FontHandle {
    pub fn builtin() -> FontHandle {
        FontHandle {
            source: FontSource::Builtin,
            family: "Helvetica".to_string(),
        }
    }

    pub fn from_path<P: Into<PathBuf>>(path: P) -> FontHandle {
        let path = path.into();
        let family = path
            .file_stem()
            .map(|stem| pdf_name(&stem.to_string_lossy()))
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| "EmbeddedFont".to_string());
        FontHandle {
            source: FontSource::File(path),
            family,
        }
    }
}

/// One entry of the automatic search, tried in order until one locates a file.
pub struct Candidate {
    pub name: &'static str,
    pub locate: fn(Option<&Path>) -> Option<PathBuf>,
}

/// The default search order used for `--font auto`.
pub const CANDIDATES: &[Candidate] = &[
    Candidate {
        name: "bundled Noto Sans JP",
        locate: locate_bundled,
    },
    Candidate {
        name: "Hiragino Sans",
        locate: locate_hiragino,
    },
    Candidate {
        name: "Noto Sans CJK",
        locate: locate_noto,
    },
];

/// Resolve the `--font` argument using the default candidate list.
///
/// `search_root` is where the search for a project-bundled font starts; usually the
/// screenshot directory.
pub fn resolve(font_arg: &str, search_root: Option<&Path>) -> Result<FontHandle> {
    resolve_with(font_arg, search_root, CANDIDATES)
}

pub fn resolve_with(
    font_arg: &str,
    search_root: Option<&Path>,
    candidates: &[Candidate],
) -> Result<FontHandle> {
    if font_arg != AUTO {
        return explicit(font_arg);
    }

    if let Some((candidate, path)) = located(search_root, candidates).next() {
        log::info!("using {} font at {}", candidate.name, path.display());
        return Ok(FontHandle::from_path(path));
    }

    log::warn!("no Japanese font found, falling back to Helvetica (ASCII and Latin-1 only)");
    Ok(FontHandle::builtin())
}

/// Resolve and parse the `--font` argument using the default candidate list.
pub fn load(font_arg: &str, search_root: Option<&Path>) -> Result<LoadedFont> {
    load_with(font_arg, search_root, CANDIDATES)
}

/// Like [`resolve_with`] followed by [`LoadedFont::load`], except that in auto mode a
/// candidate that fails to parse is skipped. Explicit paths still fail with
/// `FontLoad`.
pub fn load_with(
    font_arg: &str,
    search_root: Option<&Path>,
    candidates: &[Candidate],
) -> Result<LoadedFont> {
    if font_arg != AUTO {
        return LoadedFont::load(&explicit(font_arg)?);
    }

    for (candidate, path) in located(search_root, candidates) {
        match LoadedFont::load(&FontHandle::from_path(&path)) {
            Ok(font) => {
                log::info!("using {} font at {}", candidate.name, path.display());
                return Ok(font);
            }
            Err(e) => log::warn!("skipping {} font: {e}", candidate.name),
        }
    }

    log::warn!("no usable Japanese font found, falling back to Helvetica (ASCII and Latin-1 only)");
    LoadedFont::load(&FontHandle::builtin())
}

fn explicit(font_arg: &str) -> Result<FontHandle> {
    let path = PathBuf::from(font_arg);
    if !path.exists() {
        return Err(ReportError::FontNotFound { path });
    }
    Ok(FontHandle::from_path(path))
}

/// Candidates whose file is present, in search order.
fn located<'c>(
    search_root: Option<&'c Path>,
    candidates: &'c [Candidate],
) -> impl Iterator<Item = (&'c Candidate, PathBuf)> + 'c {
    candidates
        .iter()
        .filter_map(move |candidate| Some((candidate, (candidate.locate)(search_root)?)))
}

fn locate_bundled(search_root: Option<&Path>) -> Option<PathBuf> {
    let mut dir = search_root?.to_path_buf();
    for _ in 0..BUNDLED_SEARCH_DEPTH {
        let candidate = dir.join(BUNDLED_FONT);
        if is_usable_font_file(&candidate) {
            return Some(candidate);
        }
        if !dir.pop() {
            break;
        }
    }
    None
}

fn locate_hiragino(_: Option<&Path>) -> Option<PathBuf> {
    first_usable(HIRAGINO_PATHS)
}

fn locate_noto(_: Option<&Path>) -> Option<PathBuf> {
    first_usable(NOTO_PATHS)
}

fn first_usable(paths: &[&str]) -> Option<PathBuf> {
    paths
        .iter()
        .map(PathBuf::from)
        .find(|path| is_usable_font_file(path))
}

/// Cheap sanity check: big enough to be a real font and starts with a font magic.
pub fn is_usable_font_file(path: &Path) -> bool {
    let Ok(metadata) = std::fs::metadata(path) else {
        return false;
    };
    if !metadata.is_file() || metadata.len() < MIN_FONT_FILE_SIZE {
        return false;
    }

    let mut header = [0u8; 4];
    let read = std::fs::File::open(path).and_then(|mut file| file.read_exact(&mut header));
    read.is_ok() && FONT_MAGICS.iter().any(|magic| header.starts_with(magic))
}

/// Keep only characters that are safe inside a PDF name.
fn pdf_name(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect()
}

/// A font ready for measuring and drawing text.
pub enum LoadedFont {
    Embedded(EmbeddedFont),
    Builtin,
}

/// A parsed TrueType/OpenType face plus the glyphs used so far.
pub struct EmbeddedFont {
    pub base_font: String,
    path: PathBuf,
    data: Vec<u8>,
    face: OwnedFace,
    /// CID → (glyph id, character), for the widths array and ToUnicode map
    used: BTreeMap<u16, (u16, char)>,
}

impl LoadedFont {
    pub fn load(handle: &FontHandle) -> Result<LoadedFont> {
        let path = match &handle.source {
            FontSource::Builtin => return Ok(LoadedFont::Builtin),
            FontSource::File(path) => path,
        };

        let load_error = |reason: String| ReportError::FontLoad {
            path: path.clone(),
            reason,
        };

        let data = std::fs::read(path).map_err(|e| load_error(e.to_string()))?;
        let data = if data.starts_with(b"ttcf") {
            extract_collection_face(&data, 0).map_err(load_error)?
        } else {
            data
        };
        let face = OwnedFace::from_vec(data.clone(), 0).map_err(|e| load_error(e.to_string()))?;

        let base_font = postscript_name(&face).unwrap_or_else(|| handle.family.clone());
        log::debug!(
            "loaded font {} ({} glyphs)",
            base_font,
            face.as_face_ref().number_of_glyphs()
        );

        Ok(LoadedFont::Embedded(EmbeddedFont {
            base_font,
            path: path.clone(),
            data,
            face,
            used: BTreeMap::new(),
        }))
    }

    pub fn family(&self) -> &str {
        match self {
            LoadedFont::Embedded(font) => &font.base_font,
            LoadedFont::Builtin => "Helvetica",
        }
    }

    pub fn has_glyph(&self, c: char) -> bool {
        match self {
            LoadedFont::Embedded(font) => font.face.as_face_ref().glyph_index(c).is_some(),
            LoadedFont::Builtin => winansi_byte(c).is_some(),
        }
    }

    /// Advance width of a single character in points.
    pub fn char_width(&self, c: char, size: f32) -> f32 {
        match self {
            LoadedFont::Embedded(font) => {
                let (_, advance) = font.glyph(c);
                advance as f32 * size / font.units_per_em()
            }
            LoadedFont::Builtin => helvetica_width(c) as f32 * size / 1000.0,
        }
    }

    pub fn text_width(&self, text: &str, size: f32) -> f32 {
        text.chars().map(|c| self.char_width(c, size)).sum()
    }

    pub fn ascent(&self, size: f32) -> f32 {
        match self {
            LoadedFont::Embedded(font) => {
                font.face.as_face_ref().ascender() as f32 * size / font.units_per_em()
            }
            LoadedFont::Builtin => 0.718 * size,
        }
    }

    /// Distance below the baseline, as a positive number.
    pub fn descent(&self, size: f32) -> f32 {
        match self {
            LoadedFont::Embedded(font) => {
                -(font.face.as_face_ref().descender() as f32) * size / font.units_per_em()
            }
            LoadedFont::Builtin => 0.207 * size,
        }
    }

    /// Encode text for a `Tj` operator, recording the glyphs it uses.
    pub fn encode(&mut self, text: &str) -> Vec<u8> {
        match self {
            LoadedFont::Embedded(font) => {
                let mut bytes = Vec::with_capacity(text.len() * 2);
                for c in text.chars() {
                    let (gid, _) = font.glyph(c);
                    let cid = font.cid(gid);
                    font.used.entry(cid).or_insert((gid, c));
                    bytes.extend_from_slice(&cid.to_be_bytes());
                }
                bytes
            }
            LoadedFont::Builtin => text
                .chars()
                .map(|c| winansi_byte(c).unwrap_or(b'?'))
                .collect(),
        }
    }

    /// Write the font objects and return the reference of the top-level font.
    pub fn write(&self, pdf: &mut Pdf, alloc: &mut impl FnMut() -> Ref) -> Ref {
        let font_ref = alloc();
        match self {
            LoadedFont::Builtin => {
                pdf.type1_font(font_ref)
                    .base_font(Name(b"Helvetica"))
                    .encoding_predefined(Name(b"WinAnsiEncoding"));
            }
            LoadedFont::Embedded(font) => font.write(pdf, alloc, font_ref),
        }
        font_ref
    }
}

impl EmbeddedFont {
    fn units_per_em(&self) -> f32 {
        self.face.as_face_ref().units_per_em() as f32
    }

    /// Glyph id and advance for a character; missing glyphs map to `.notdef`.
    fn glyph(&self, c: char) -> (u16, u16) {
        let face = self.face.as_face_ref();
        let gid = face.glyph_index(c).unwrap_or(GlyphId(0));
        let advance = face
            .glyph_hor_advance(gid)
            .unwrap_or(face.units_per_em() / 2);
        (gid.0, advance)
    }

    /// The CID a glyph is shown under.
    fn cid(&self, gid: u16) -> u16 {
        self.face
            .as_face_ref()
            .tables()
            .cff
            .as_ref()
            .and_then(|cff| cff.glyph_cid(GlyphId(gid)))
            .unwrap_or(gid)
    }

    fn is_truetype(&self) -> bool {
        self.face.as_face_ref().tables().glyf.is_some()
    }

    fn write(&self, pdf: &mut Pdf, alloc: &mut impl FnMut() -> Ref, font_ref: Ref) {
        let cid_ref = alloc();
        let descriptor_ref = alloc();
        let cmap_ref = alloc();
        let data_ref = alloc();

        let face = self.face.as_face_ref();
        let scale = 1000.0 / self.units_per_em();
        let base_font = Name(self.base_font.as_bytes());

        pdf.type0_font(font_ref)
            .base_font(base_font)
            .encoding_predefined(Name(b"Identity-H"))
            .descendant_font(cid_ref)
            .to_unicode(cmap_ref);

        {
            let mut cid = pdf.cid_font(cid_ref);
            cid.subtype(if self.is_truetype() {
                CidFontType::Type2
            } else {
                CidFontType::Type0
            });
            cid.base_font(base_font);
            cid.system_info(identity_system_info());
            cid.font_descriptor(descriptor_ref);
            cid.default_width(0.0);
            if self.is_truetype() {
                cid.cid_to_gid_map_predefined(Name(b"Identity"));
            }
            let mut widths = cid.widths();
            for (&cid, &(gid, _)) in &self.used {
                let advance = face.glyph_hor_advance(GlyphId(gid)).unwrap_or(0);
                widths.consecutive(cid, [advance as f32 * scale]);
            }
        }

        let bbox = face.global_bounding_box();
        {
            let mut descriptor = pdf.font_descriptor(descriptor_ref);
            descriptor
                .name(base_font)
                .flags(FontFlags::NON_SYMBOLIC)
                .bbox(Rect::new(
                    bbox.x_min as f32 * scale,
                    bbox.y_min as f32 * scale,
                    bbox.x_max as f32 * scale,
                    bbox.y_max as f32 * scale,
                ))
                .italic_angle(0.0)
                .ascent(face.ascender() as f32 * scale)
                .descent(face.descender() as f32 * scale)
                .cap_height(face.capital_height().unwrap_or(face.ascender()) as f32 * scale)
                .stem_v(80.0);
            if self.is_truetype() {
                descriptor.font_file2(data_ref);
            } else {
                descriptor.font_file3(data_ref);
            }
        }

        let mut cmap = UnicodeCmap::new(Name(b"Custom"), identity_system_info());
        for (&cid, &(_, c)) in &self.used {
            cmap.pair(cid, c);
        }
        pdf.cmap(cmap_ref, &cmap.finish());

        let compressed = super::deflate(&self.data);
        match compressed {
            Ok(compressed) => {
                let mut stream = pdf.stream(data_ref, &compressed);
                stream.filter(Filter::FlateDecode);
                if self.is_truetype() {
                    stream.pair(Name(b"Length1"), self.data.len() as i32);
                } else {
                    stream.pair(Name(b"Subtype"), Name(b"OpenType"));
                }
            }
            Err(e) => {
                log::warn!(
                    "could not compress font {}, embedding uncompressed: {e}",
                    self.path.display()
                );
                let mut stream = pdf.stream(data_ref, &self.data);
                if self.is_truetype() {
                    stream.pair(Name(b"Length1"), self.data.len() as i32);
                } else {
                    stream.pair(Name(b"Subtype"), Name(b"OpenType"));
                }
            }
        }
    }
}

fn identity_system_info() -> SystemInfo<'static> {
    SystemInfo {
        registry: Str(b"Adobe"),
        ordering: Str(b"Identity"),
        supplement: 0,
    }
}

fn postscript_name(face: &OwnedFace) -> Option<String> {
    face.as_face_ref()
        .names()
        .into_iter()
        .filter(|name| name.name_id == owned_ttf_parser::name_id::POST_SCRIPT_NAME)
        .find_map(|name| name.to_string())
        .map(|name| pdf_name(&name))
        .filter(|name| !name.is_empty())
}

/// Rebuild a standalone sfnt from one face of a TrueType/OpenType collection.
pub fn extract_collection_face(data: &[u8], index: u32) -> std::result::Result<Vec<u8>, String> {
    let read_u32 = |at: usize| -> std::result::Result<u32, String> {
        data.get(at..at + 4)
            .map(|b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
            .ok_or_else(|| format!("collection truncated at offset {at}"))
    };
    let read_u16 = |at: usize| -> std::result::Result<u16, String> {
        data.get(at..at + 2)
            .map(|b| u16::from_be_bytes([b[0], b[1]]))
            .ok_or_else(|| format!("collection truncated at offset {at}"))
    };

    let num_fonts = read_u32(8)?;
    if index >= num_fonts {
        return Err(format!(
            "collection has {num_fonts} faces, face {index} requested"
        ));
    }
    let face_offset = read_u32(12 + 4 * index as usize)? as usize;
    let num_tables = read_u16(face_offset + 4)? as usize;

    let header_len = 12 + 16 * num_tables;
    let header = data
        .get(face_offset..face_offset + header_len)
        .ok_or("collection table directory truncated")?;

    let mut out = Vec::with_capacity(header_len);
    out.extend_from_slice(&header[..12]);
    out.resize(header_len, 0);

    let mut tables = Vec::with_capacity(num_tables);
    for i in 0..num_tables {
        let record = face_offset + 12 + 16 * i;
        let offset = read_u32(record + 8)? as usize;
        let length = read_u32(record + 12)? as usize;
        let table = data
            .get(offset..offset + length)
            .ok_or_else(|| format!("table {i} lies outside the collection"))?;
        tables.push((record, table));
    }

    for (i, (record, table)) in tables.into_iter().enumerate() {
        let new_offset = out.len() as u32;
        let entry = 12 + 16 * i;
        // tag and checksum are unchanged
        out[entry..entry + 8].copy_from_slice(&data[record..record + 8]);
        out[entry + 8..entry + 12].copy_from_slice(&new_offset.to_be_bytes());
        out[entry + 12..entry + 16].copy_from_slice(&(table.len() as u32).to_be_bytes());
        out.extend_from_slice(table);
        while out.len() % 4 != 0 {
            out.push(0);
        }
    }

    Ok(out)
}

fn winansi_byte(c: char) -> Option<u8> {
    match c as u32 {
        0x20..=0x7e | 0xa0..=0xff => Some(c as u8),
        _ => None,
    }
}

/// Helvetica advance widths (1/1000 em) for printable ASCII.
const HELVETICA_ASCII: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // '0'..'?'
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // '@'..'O'
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // 'P'..'_'
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // '`'..'o'
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // 'p'..'~'
];

fn helvetica_width(c: char) -> u16 {
    match winansi_byte(c) {
        Some(b @ 0x20..=0x7e) => HELVETICA_ASCII[(b - 0x20) as usize],
        Some(_) => 556,
        // drawn as '?'
        None => 556,
    }
}
