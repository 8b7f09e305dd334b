use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::codec;
use crate::error::{Error, Result};
use crate::point::WGS84Point;
use crate::polygon::Ring;
use crate::record::PolygonDraft;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    GeoJson,
    Kml,
    Gpx,
}

impl Format {
    pub fn from_path(path: &Path) -> Option<Format> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "geojson" | "json" => Some(Format::GeoJson),
            "kml" => Some(Format::Kml),
            "gpx" => Some(Format::Gpx),
            _ => None,
        }
    }
}

mod lockml {
    use super::*;
    use kml::Kml;
    use kml::types::Geometry;

    fn collect(kml: &Kml, out: &mut Vec<PolygonDraft>) {
        match kml {
            Kml::KmlDocument(doc) => doc.elements.iter().for_each(|e| collect(e, out)),
            Kml::Document { elements, .. } => elements.iter().for_each(|e| collect(e, out)),
            Kml::Folder(z) => z.elements.iter().for_each(|e| collect(e, out)),
            Kml::Placemark(p) => {
                if let Some(Geometry::Polygon(ls)) = &p.geometry {
                    // needs the kml crate's geo-types feature (on by default)
                    let polygon = geo::Polygon::from(ls.clone());
                    let wgs: Vec<WGS84Point> = polygon
                        .exterior()
                        .0
                        .iter()
                        .map(|c| WGS84Point::new(c.x, c.y))
                        .collect();
                    out.push(PolygonDraft {
                        name: p.name.clone().unwrap_or_default(),
                        ring: Ring::from_closed(wgs),
                    });
                }
            }
            _ => {}
        }
    }

    pub fn read(content: &str) -> std::result::Result<Vec<PolygonDraft>, String> {
        let kml = content.parse::<Kml>().map_err(|e| format!("{}", e))?;
        let mut out = Vec::new();
        collect(&kml, &mut out);
        Ok(out)
    }
}

mod locgpx {
    use super::*;
    use gpx::Gpx;
    use std::io::Cursor;

    /// One polygon per track segment; multi-segment tracks get a `#n` suffix.
    pub fn read(content: &str) -> std::result::Result<Vec<PolygonDraft>, String> {
        let gpx: Gpx = gpx::read(Cursor::new(content)).map_err(|e| e.to_string())?;

        Ok(gpx
            .tracks
            .iter()
            .flat_map(|track| {
                let base = track.name.clone().unwrap_or_default();
                let multi = track.segments.len() > 1;
                track.segments.iter().enumerate().map(move |(i, segment)| {
                    let wgs: Vec<WGS84Point> = segment
                        .points
                        .iter()
                        .map(|point| WGS84Point::new(point.point().x(), point.point().y()))
                        .collect();
                    let name = if multi {
                        format!("{} #{}", base, i + 1)
                    } else {
                        base.clone()
                    };
                    PolygonDraft {
                        name,
                        ring: Ring::from_closed(wgs),
                    }
                })
            })
            .collect())
    }
}

pub fn read_str(format: Format, content: &str, origin: &str) -> Result<Vec<PolygonDraft>> {
    let import_error = |message: String| Error::Import {
        path: origin.to_string(),
        message,
    };
    let drafts = match format {
        Format::GeoJson => codec::drafts_from_str(content)?,
        Format::Kml => lockml::read(content).map_err(import_error)?,
        Format::Gpx => locgpx::read(content).map_err(import_error)?,
    };
    if drafts.is_empty() {
        return Err(import_error("no polygons found".to_string()));
    }
    log::info!("import: {} polygons from {}", drafts.len(), origin);
    Ok(drafts)
}

pub fn read_file(path: &Path) -> Result<Vec<PolygonDraft>> {
    let origin = path.display().to_string();
    let import_error = |message: String| Error::Import {
        path: origin.clone(),
        message,
    };
    let format = Format::from_path(path)
        .ok_or_else(|| import_error("unsupported file extension".to_string()))?;

    let mut content = String::new();
    File::open(path)
        .and_then(|mut file| file.read_to_string(&mut content))
        .map_err(|e| import_error(e.to_string()))?;
    read_str(format, &content, &origin)
}
