use crate::{
    foundation::{
        core::{Point, SkyCoord},
        error::{SkyplotError, SkyplotResult},
    },
    wcs::{SkyProjection, header::FitsHeader},
};

const SIP_MAX_ORDER: u32 = 9;
const SIP_INVERSE_ITERATIONS: usize = 20;

/// A SIP distortion polynomial: `sum c * u^p * v^q`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SipPolynomial {
    terms: Vec<(i32, i32, f64)>,
}

impl SipPolynomial {
    pub fn new(terms: Vec<(i32, i32, f64)>) -> Self {
        Self { terms }
    }

    fn from_header(header: &FitsHeader, prefix: &str) -> SkyplotResult<Option<Self>> {
        let Some(order) = header.f64(&format!("{prefix}_ORDER")) else {
            return Ok(None);
        };
        if order < 0.0 || order > f64::from(SIP_MAX_ORDER) || order.fract() != 0.0 {
            return Err(SkyplotError::config(format!(
                "{prefix}_ORDER must be an integer in 0..={SIP_MAX_ORDER}, got {order}"
            )));
        }
        let order = order as i32;
        let mut terms = Vec::new();
        for p in 0..=order {
            for q in 0..=(order - p) {
                if let Some(c) = header.f64(&format!("{prefix}_{p}_{q}"))
                    && c != 0.0
                {
                    terms.push((p, q, c));
                }
            }
        }
        Ok(Some(Self { terms }))
    }

    pub fn eval(&self, u: f64, v: f64) -> f64 {
        self.terms
            .iter()
            .map(|&(p, q, c)| c * u.powi(p) * v.powi(q))
            .sum()
    }
}

/// Simple Imaging Polynomial distortion on top of a TAN projection.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Sip {
    pub a: SipPolynomial,
    pub b: SipPolynomial,
    /// Inverse polynomials; when absent the forward ones are inverted iteratively.
    pub ap: Option<SipPolynomial>,
    pub bp: Option<SipPolynomial>,
}

impl Sip {
    fn distort(&self, u: f64, v: f64) -> (f64, f64) {
        (u + self.a.eval(u, v), v + self.b.eval(u, v))
    }

    fn undistort(&self, u: f64, v: f64) -> (f64, f64) {
        if let (Some(ap), Some(bp)) = (&self.ap, &self.bp) {
            return (u + ap.eval(u, v), v + bp.eval(u, v));
        }
        let (mut x, mut y) = (u, v);
        for _ in 0..SIP_INVERSE_ITERATIONS {
            x = u - self.a.eval(x, y);
            y = v - self.b.eval(x, y);
        }
        (x, y)
    }
}

/// Gnomonic (TAN) projection with an optional SIP distortion.
///
/// Pixel coordinates are 0-based; `crpix` has already been shifted from the
/// 1-based FITS convention.
#[derive(Clone, Debug, PartialEq)]
pub struct TanWcs {
    crval: SkyCoord,
    crpix: Point,
    cd: [[f64; 2]; 2],
    cd_inv: [[f64; 2]; 2],
    sip: Option<Sip>,
}

impl TanWcs {
    /// `cd` maps pixel offsets to intermediate world coordinates in degrees.
    pub fn new(crval: SkyCoord, crpix: Point, cd: [[f64; 2]; 2]) -> SkyplotResult<Self> {
        let det = cd[0][0] * cd[1][1] - cd[0][1] * cd[1][0];
        if !det.is_finite() || det == 0.0 {
            return Err(SkyplotError::config("CD matrix is singular"));
        }
        let cd_inv = [
            [cd[1][1] / det, -cd[0][1] / det],
            [-cd[1][0] / det, cd[0][0] / det],
        ];
        Ok(Self {
            crval,
            crpix,
            cd,
            cd_inv,
            sip: None,
        })
    }

    pub fn with_sip(mut self, sip: Sip) -> Self {
        self.sip = Some(sip);
        self
    }

    pub fn crval(&self) -> SkyCoord {
        self.crval
    }

    pub fn crpix(&self) -> Point {
        self.crpix
    }

    pub fn from_header(header: &FitsHeader) -> SkyplotResult<Self> {
        let mut has_sip = false;
        for (key, expected) in [("CTYPE1", "RA---TAN"), ("CTYPE2", "DEC--TAN")] {
            if let Some(ctype) = header.str(key) {
                if !ctype.starts_with(expected) {
                    return Err(SkyplotError::config(format!(
                        "{key} = '{ctype}' is not a TAN projection"
                    )));
                }
                has_sip |= ctype.ends_with("-SIP");
            }
        }

        let required = |key: &str| {
            header
                .f64(key)
                .ok_or_else(|| SkyplotError::config(format!("missing WCS keyword {key}")))
        };

        let crval = SkyCoord::new(required("CRVAL1")?, required("CRVAL2")?);
        let crpix = Point::new(required("CRPIX1")? - 1.0, required("CRPIX2")? - 1.0);
        let cd = match (
            header.f64("CD1_1"),
            header.f64("CD1_2"),
            header.f64("CD2_1"),
            header.f64("CD2_2"),
        ) {
            (Some(a), b, c, Some(d)) => [[a, b.unwrap_or(0.0)], [c.unwrap_or(0.0), d]],
            _ => {
                let cdelt1 = required("CDELT1")?;
                let cdelt2 = required("CDELT2")?;
                let pc = |key: &str, default: f64| header.f64(key).unwrap_or(default);
                [
                    [cdelt1 * pc("PC1_1", 1.0), cdelt1 * pc("PC1_2", 0.0)],
                    [cdelt2 * pc("PC2_1", 0.0), cdelt2 * pc("PC2_2", 1.0)],
                ]
            }
        };

        let wcs = Self::new(crval, crpix, cd)?;
        if !has_sip {
            return Ok(wcs);
        }
        let missing = || SkyplotError::config("TAN-SIP header without A_ORDER/B_ORDER");
        let sip = Sip {
            a: SipPolynomial::from_header(header, "A")?.ok_or_else(missing)?,
            b: SipPolynomial::from_header(header, "B")?.ok_or_else(missing)?,
            ap: SipPolynomial::from_header(header, "AP")?,
            bp: SipPolynomial::from_header(header, "BP")?,
        };
        Ok(wcs.with_sip(sip))
    }

    /// East and north unit vectors of the tangent plane at `crval`.
    fn tangent_basis(&self) -> ([f64; 3], [f64; 3], [f64; 3]) {
        let (ra, dec) = (self.crval.ra_deg.to_radians(), self.crval.dec_deg.to_radians());
        let r = self.crval.to_unit_vector();
        let east = [-ra.sin(), ra.cos(), 0.0];
        let north = [-dec.sin() * ra.cos(), -dec.sin() * ra.sin(), dec.cos()];
        (r, east, north)
    }
}

fn dot(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

impl SkyProjection for TanWcs {
    fn pixel_to_sky(&self, pixel: Point) -> Option<SkyCoord> {
        let (mut u, mut v) = (pixel.x - self.crpix.x, pixel.y - self.crpix.y);
        if let Some(sip) = &self.sip {
            (u, v) = sip.distort(u, v);
        }
        let xi = (self.cd[0][0] * u + self.cd[0][1] * v).to_radians();
        let eta = (self.cd[1][0] * u + self.cd[1][1] * v).to_radians();

        let (r, east, north) = self.tangent_basis();
        let p = [
            r[0] + xi * east[0] + eta * north[0],
            r[1] + xi * east[1] + eta * north[1],
            r[2] + xi * east[2] + eta * north[2],
        ];
        let norm = dot(p, p).sqrt();
        if !norm.is_finite() || norm == 0.0 {
            return None;
        }
        Some(SkyCoord::from_unit_vector([
            p[0] / norm,
            p[1] / norm,
            p[2] / norm,
        ]))
    }

    fn sky_to_pixel(&self, sky: SkyCoord) -> Option<Point> {
        let s = sky.to_unit_vector();
        let (r, east, north) = self.tangent_basis();
        // Points on or behind the tangent plane's horizon have no projection.
        let w = dot(s, r);
        if w <= 0.0 {
            return None;
        }
        let xi = (dot(s, east) / w).to_degrees();
        let eta = (dot(s, north) / w).to_degrees();

        let mut u = self.cd_inv[0][0] * xi + self.cd_inv[0][1] * eta;
        let mut v = self.cd_inv[1][0] * xi + self.cd_inv[1][1] * eta;
        if let Some(sip) = &self.sip {
            (u, v) = sip.undistort(u, v);
        }
        let p = Point::new(u + self.crpix.x, v + self.crpix.y);
        (p.x.is_finite() && p.y.is_finite()).then_some(p)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/wcs/tan.rs"]
mod tests;
