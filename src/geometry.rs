//! Positions of array elements as functions of time.
//!
//! Ground arrays have fixed stations; formation-flying apertures don't. Both
//! answer [`Trajectory::position_at`], so code computing baselines or delays
//! doesn't need to know which kind of array it is looking at.

use std::ops::{Add, Mul, Sub};

use thiserror::Error;
use vec1::Vec1;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    #[error("Time {time} s is outside the sampled span [{start}, {end}] s")]
    OutOfRange { time: f64, start: f64, end: f64 },

    #[error("Hermite interpolation needs a velocity at the sample at {time} s")]
    MissingVelocity { time: f64 },

    #[error("Sample {index} at {time} s does not come after the previous sample at {previous} s")]
    NonMonotonic {
        index: usize,
        previous: f64,
        time: f64,
    },

    #[error("A time-varying trajectory needs at least one sample")]
    NoSamples,

    #[error("No array element with STA_INDEX {0}")]
    UnknownElement(i32),
}

/// A Cartesian position \[metres\] or velocity \[metres/second\].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Vector3 {
        Vector3 { x, y, z }
    }

    pub fn norm(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

impl Add for Vector3 {
    type Output = Vector3;

    fn add(self, rhs: Vector3) -> Vector3 {
        Vector3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vector3 {
    type Output = Vector3;

    fn sub(self, rhs: Vector3) -> Vector3 {
        Vector3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f64> for Vector3 {
    type Output = Vector3;

    fn mul(self, rhs: f64) -> Vector3 {
        Vector3::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interpolation {
    /// Straight lines between consecutive samples.
    #[default]
    Linear,
    /// Cubic Hermite segments using the sampled velocities.
    Hermite,
}

impl Interpolation {
    /// The value stored in the `INTERP` column.
    pub fn tag(self) -> &'static str {
        match self {
            Interpolation::Linear => "LINEAR",
            Interpolation::Hermite => "HERMITE",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Interpolation> {
        match tag {
            "LINEAR" => Some(Interpolation::Linear),
            "HERMITE" => Some(Interpolation::Hermite),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionSample {
    /// Seconds since the document epoch.
    pub time: f64,
    pub position: Vector3,
    pub velocity: Option<Vector3>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Trajectory {
    Static(Vector3),
    Sampled {
        samples: Vec1<PositionSample>,
        interpolation: Interpolation,
    },
}

impl Trajectory {
    /// Build a time-varying trajectory. Samples must be strictly increasing in
    /// time, and all of them need velocities for Hermite interpolation.
    pub fn sampled(
        samples: Vec<PositionSample>,
        interpolation: Interpolation,
    ) -> Result<Trajectory, GeometryError> {
        let samples = Vec1::try_from_vec(samples).map_err(|_| GeometryError::NoSamples)?;
        for (index, pair) in samples.windows(2).enumerate() {
            // Written as a negation so that NaN times are refused too.
            if !(pair[1].time > pair[0].time) {
                return Err(GeometryError::NonMonotonic {
                    index: index + 1,
                    previous: pair[0].time,
                    time: pair[1].time,
                });
            }
        }
        if interpolation == Interpolation::Hermite {
            if let Some(s) = samples.iter().find(|s| s.velocity.is_none()) {
                return Err(GeometryError::MissingVelocity { time: s.time });
            }
        }
        Ok(Trajectory::Sampled {
            samples,
            interpolation,
        })
    }

    /// The first and last sampled times, or `None` for a static position
    /// (valid at every time).
    pub fn span(&self) -> Option<(f64, f64)> {
        match self {
            Trajectory::Static(_) => None,
            Trajectory::Sampled { samples, .. } => Some((samples.first().time, samples.last().time)),
        }
    }

    /// The position at `time` (seconds since the document epoch). Querying a
    /// sampled trajectory outside its span is an error; nothing is
    /// extrapolated. At a sample's own time the sample is returned as-is.
    pub fn position_at(&self, time: f64) -> Result<Vector3, GeometryError> {
        let (samples, interpolation) = match self {
            Trajectory::Static(p) => return Ok(*p),
            Trajectory::Sampled {
                samples,
                interpolation,
            } => (samples, *interpolation),
        };

        let start = samples.first().time;
        let end = samples.last().time;
        if !(time >= start && time <= end) {
            return Err(GeometryError::OutOfRange { time, start, end });
        }

        // The number of samples at or before `time`; at least 1 given the
        // range check above.
        let i = samples.partition_point(|s| s.time <= time);
        let a = &samples[i - 1];
        if a.time == time {
            return Ok(a.position);
        }
        // `time` < `end`, so there is a later sample.
        let b = &samples[i];
        let dt = b.time - a.time;
        let u = (time - a.time) / dt;

        let position = match interpolation {
            Interpolation::Linear => a.position + (b.position - a.position) * u,
            Interpolation::Hermite => {
                let va = a
                    .velocity
                    .ok_or(GeometryError::MissingVelocity { time: a.time })?;
                let vb = b
                    .velocity
                    .ok_or(GeometryError::MissingVelocity { time: b.time })?;
                let u2 = u * u;
                let u3 = u2 * u;
                let h00 = 2.0 * u3 - 3.0 * u2 + 1.0;
                let h10 = u3 - 2.0 * u2 + u;
                let h01 = -2.0 * u3 + 3.0 * u2;
                let h11 = u3 - u2;
                a.position * h00 + va * (h10 * dt) + b.position * h01 + vb * (h11 * dt)
            }
        };
        Ok(position)
    }
}

/// One aperture of the array.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayElement {
    /// `STA_INDEX`.
    pub id: i32,
    pub tel_name: String,
    pub sta_name: String,
    /// \[metres\]
    pub diameter: f64,
    pub trajectory: Trajectory,
}

impl ArrayElement {
    pub fn position_at(&self, time: f64) -> Result<Vector3, GeometryError> {
        self.trajectory.position_at(time)
    }

    pub fn is_static(&self) -> bool {
        matches!(self.trajectory, Trajectory::Static(_))
    }
}

/// The baseline vector from `a` to `b` at `time`.
pub fn baseline_at(a: &ArrayElement, b: &ArrayElement, time: f64) -> Result<Vector3, GeometryError> {
    Ok(b.position_at(time)? - a.position_at(time)?)
}
