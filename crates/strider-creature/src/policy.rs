//! Motor control policies
//!
//! A policy maps an [`Observation`] and the episode time to one target angle
//! per motor joint. Policies are pure: the same parameters, observation and
//! time always produce the same targets.
//!
//! Parameters travel through the optimizer as flat `f32` vectors. Use
//! [`PolicyParams::from_flat`] to get a typed view; the layouts are:
//!
//! | Kind       | Layout                                                        |
//! |------------|---------------------------------------------------------------|
//! | Oscillator | `[offset, amplitude, phase] * n`, `frequency`                 |
//! | Reflex     | `[w_tilt, w_vx, w_contact, bias] * n`                         |
//! | Hybrid     | oscillator block, reflex block, `blend * n`                   |

use std::f32::consts::TAU;

use serde::{Deserialize, Serialize};

use crate::blueprint::{JointLimits, RobotBlueprint};
use crate::builder::{hybrid_len, oscillator_len, reflex_len};
use crate::error::PolicyError;
use crate::sensors::Observation;

/// Lowest frequency (Hz) an oscillator runs at
pub const MIN_FREQUENCY: f32 = 0.3;
/// Amplitude is scaled down by this much per unit of tilt
const TILT_DAMPING: f32 = 0.8;
const MIN_AMPLITUDE_FACTOR: f32 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PolicyKind {
    /// Open-loop sine per joint
    #[default]
    Oscillator,
    /// Linear feedback on tilt, forward velocity and foot contact
    Reflex,
    /// Per-joint blend of the two
    Hybrid,
}

impl PolicyKind {
    pub fn all() -> &'static [PolicyKind] {
        &[PolicyKind::Oscillator, PolicyKind::Reflex, PolicyKind::Hybrid]
    }

    /// Length of the flat parameter vector for `blueprint`
    pub fn param_count(&self, blueprint: &RobotBlueprint) -> usize {
        self.flat_len(blueprint.motor_joint_count())
    }

    fn flat_len(&self, motor_joints: usize) -> usize {
        match self {
            PolicyKind::Oscillator => oscillator_len(motor_joints),
            PolicyKind::Reflex => reflex_len(motor_joints),
            PolicyKind::Hybrid => hybrid_len(motor_joints),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PolicyKind::Oscillator => "oscillator",
            PolicyKind::Reflex => "reflex",
            PolicyKind::Hybrid => "hybrid",
        }
    }
}

impl std::fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for PolicyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "oscillator" | "cpg" => Ok(PolicyKind::Oscillator),
            "reflex" => Ok(PolicyKind::Reflex),
            "hybrid" => Ok(PolicyKind::Hybrid),
            _ => Err(format!(
                "Unknown policy: {}. Valid: oscillator, reflex, hybrid",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OscillatorParams {
    pub(crate) offsets: Vec<f32>,
    pub(crate) amplitudes: Vec<f32>,
    pub(crate) phases: Vec<f32>,
    pub(crate) frequency: f32,
}

impl OscillatorParams {
    pub fn offsets(&self) -> &[f32] {
        &self.offsets
    }

    pub fn amplitudes(&self) -> &[f32] {
        &self.amplitudes
    }

    pub fn phases(&self) -> &[f32] {
        &self.phases
    }

    /// Shared frequency in Hz, floored at [`MIN_FREQUENCY`] when evaluated
    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    fn motor_joints(&self) -> usize {
        self.offsets
            .len()
            .min(self.amplitudes.len())
            .min(self.phases.len())
    }

    fn from_flat(n: usize, flat: &[f32]) -> Self {
        let mut offsets = Vec::with_capacity(n);
        let mut amplitudes = Vec::with_capacity(n);
        let mut phases = Vec::with_capacity(n);
        for chunk in flat[..3 * n].chunks_exact(3) {
            offsets.push(chunk[0]);
            amplitudes.push(chunk[1]);
            phases.push(chunk[2]);
        }
        Self {
            offsets,
            amplitudes,
            phases,
            frequency: flat[3 * n],
        }
    }

    fn write_flat(&self, out: &mut Vec<f32>) {
        for i in 0..self.motor_joints() {
            out.extend_from_slice(&[self.offsets[i], self.amplitudes[i], self.phases[i]]);
        }
        out.push(self.frequency);
    }

    fn target(&self, joint: usize, amplitude_factor: f32, t: f32) -> f32 {
        let freq = self.frequency.max(MIN_FREQUENCY);
        self.offsets[joint]
            + self.amplitudes[joint] * amplitude_factor * (TAU * freq * t + self.phases[joint]).sin()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReflexParams {
    pub(crate) w_tilt: Vec<f32>,
    pub(crate) w_vx: Vec<f32>,
    pub(crate) w_contact: Vec<f32>,
    pub(crate) bias: Vec<f32>,
}

impl ReflexParams {
    pub fn w_tilt(&self) -> &[f32] {
        &self.w_tilt
    }

    pub fn w_vx(&self) -> &[f32] {
        &self.w_vx
    }

    pub fn w_contact(&self) -> &[f32] {
        &self.w_contact
    }

    pub fn bias(&self) -> &[f32] {
        &self.bias
    }

    fn motor_joints(&self) -> usize {
        self.w_tilt
            .len()
            .min(self.w_vx.len())
            .min(self.w_contact.len())
            .min(self.bias.len())
    }

    fn from_flat(n: usize, flat: &[f32]) -> Self {
        let mut params = Self {
            w_tilt: Vec::with_capacity(n),
            w_vx: Vec::with_capacity(n),
            w_contact: Vec::with_capacity(n),
            bias: Vec::with_capacity(n),
        };
        for chunk in flat[..4 * n].chunks_exact(4) {
            params.w_tilt.push(chunk[0]);
            params.w_vx.push(chunk[1]);
            params.w_contact.push(chunk[2]);
            params.bias.push(chunk[3]);
        }
        params
    }

    fn write_flat(&self, out: &mut Vec<f32>) {
        for i in 0..self.motor_joints() {
            out.extend_from_slice(&[self.w_tilt[i], self.w_vx[i], self.w_contact[i], self.bias[i]]);
        }
    }

    fn target(&self, joint: usize, obs: &Observation, contact: f32) -> f32 {
        self.w_tilt[joint] * obs.tilt
            + self.w_vx[joint] * obs.com_velocity[0]
            + self.w_contact[joint] * contact
            + self.bias[joint]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HybridParams {
    pub(crate) oscillator: OscillatorParams,
    pub(crate) reflex: ReflexParams,
    pub(crate) blend: Vec<f32>,
}

impl HybridParams {
    pub fn oscillator(&self) -> &OscillatorParams {
        &self.oscillator
    }

    pub fn reflex(&self) -> &ReflexParams {
        &self.reflex
    }

    /// Per joint; `clamp(blend + 0.5, 0, 1)` weights the oscillator
    pub fn blend(&self) -> &[f32] {
        &self.blend
    }

    fn motor_joints(&self) -> usize {
        self.blend
            .len()
            .min(self.oscillator.motor_joints())
            .min(self.reflex.motor_joints())
    }
}

/// Typed, length-checked policy parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PolicyParams {
    Oscillator(OscillatorParams),
    Reflex(ReflexParams),
    Hybrid(HybridParams),
}

impl PolicyParams {
    /// Interpret `flat` as parameters of `kind` for `motor_joints` joints
    pub fn from_flat(
        kind: PolicyKind,
        motor_joints: usize,
        flat: &[f32],
    ) -> Result<Self, PolicyError> {
        let n = motor_joints;
        let expected = kind.flat_len(n);
        if flat.len() != expected {
            return Err(PolicyError::ParamLength {
                kind,
                expected,
                actual: flat.len(),
            });
        }

        Ok(match kind {
            PolicyKind::Oscillator => PolicyParams::Oscillator(OscillatorParams::from_flat(n, flat)),
            PolicyKind::Reflex => PolicyParams::Reflex(ReflexParams::from_flat(n, flat)),
            PolicyKind::Hybrid => {
                let (osc, rest) = flat.split_at(oscillator_len(n));
                let (reflex, blend) = rest.split_at(reflex_len(n));
                PolicyParams::Hybrid(HybridParams {
                    oscillator: OscillatorParams::from_flat(n, osc),
                    reflex: ReflexParams::from_flat(n, reflex),
                    blend: blend.to_vec(),
                })
            }
        })
    }

    pub fn kind(&self) -> PolicyKind {
        match self {
            PolicyParams::Oscillator(_) => PolicyKind::Oscillator,
            PolicyParams::Reflex(_) => PolicyKind::Reflex,
            PolicyParams::Hybrid(_) => PolicyKind::Hybrid,
        }
    }

    /// Joints every parameter list has an entry for
    pub fn motor_joints(&self) -> usize {
        match self {
            PolicyParams::Oscillator(p) => p.motor_joints(),
            PolicyParams::Reflex(p) => p.motor_joints(),
            PolicyParams::Hybrid(p) => p.motor_joints(),
        }
    }

    pub fn to_flat(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.kind().flat_len(self.motor_joints()));
        match self {
            PolicyParams::Oscillator(p) => p.write_flat(&mut out),
            PolicyParams::Reflex(p) => p.write_flat(&mut out),
            PolicyParams::Hybrid(p) => {
                p.oscillator.write_flat(&mut out);
                p.reflex.write_flat(&mut out);
                out.extend_from_slice(&p.blend);
            }
        }
        out
    }
}

/// Target angle per motor joint, each clamped into that joint's limits.
///
/// `limits` should hold one entry per motor joint; joints beyond the shorter
/// of `limits` and the parameter set are not produced.
pub fn compute_targets(
    params: &PolicyParams,
    obs: &Observation,
    limits: &[JointLimits],
    t: f32,
) -> Vec<f32> {
    let n = params.motor_joints().min(limits.len());
    let amplitude_factor = (1.0 - TILT_DAMPING * obs.tilt.abs()).max(MIN_AMPLITUDE_FACTOR);
    let contact = obs.mean_foot_contact();

    (0..n)
        .map(|i| {
            let raw = match params {
                PolicyParams::Oscillator(p) => p.target(i, amplitude_factor, t),
                PolicyParams::Reflex(p) => p.target(i, obs, contact),
                PolicyParams::Hybrid(p) => {
                    let w = (p.blend[i] + 0.5).clamp(0.0, 1.0);
                    w * p.oscillator.target(i, amplitude_factor, t)
                        + (1.0 - w) * p.reflex.target(i, obs, contact)
                }
            };
            limits[i].clamp(raw)
        })
        .collect()
}
