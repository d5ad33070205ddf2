//! Accelerator components seen by the tracking processes.

use std::fmt;

use crate::{Aperture, HollowElectronLens};

/// Element category, queried instead of inspecting concrete types.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementKind {
    /// Field-free drift.
    Drift,
    /// Any magnet; transport is handled outside the processes.
    Magnet,
    /// Collimator (spoiler) whose jaws can scatter particles.
    Collimator,
    /// Hollow electron lens.
    HollowElectronLens(HollowElectronLens),
    /// Zero-effect marker.
    Marker,
}

impl ElementKind {
    /// Type name used in qualified component names.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Drift => "Drift",
            Self::Magnet => "Magnet",
            Self::Collimator => "Collimator",
            Self::HollowElectronLens(_) => "HollowElectronLens",
            Self::Marker => "Marker",
        }
    }
}

/// One element of a beamline.
#[derive(Debug)]
pub struct Component {
    name: String,
    length: f64,
    position: f64,
    kind: ElementKind,
    aperture: Option<Box<dyn Aperture>>,
}

impl Component {
    /// Creates a component without an aperture.
    #[must_use]
    pub fn new(name: impl Into<String>, length: f64, kind: ElementKind) -> Self {
        Self {
            name: name.into(),
            length,
            position: 0.0,
            kind,
            aperture: None,
        }
    }

    /// Creates a drift.
    #[must_use]
    pub fn drift(name: impl Into<String>, length: f64) -> Self {
        Self::new(name, length, ElementKind::Drift)
    }

    /// Creates a zero-length marker.
    #[must_use]
    pub fn marker(name: impl Into<String>) -> Self {
        Self::new(name, 0.0, ElementKind::Marker)
    }

    /// Creates a collimator with the given jaw aperture.
    #[must_use]
    pub fn collimator(name: impl Into<String>, length: f64, aperture: Box<dyn Aperture>) -> Self {
        Self::new(name, length, ElementKind::Collimator).with_aperture(aperture)
    }

    /// Creates a hollow electron lens element.
    #[must_use]
    pub fn electron_lens(
        name: impl Into<String>,
        length: f64,
        lens: HollowElectronLens,
    ) -> Self {
        Self::new(name, length, ElementKind::HollowElectronLens(lens))
    }

    /// Attaches an aperture.
    #[must_use]
    pub fn with_aperture(mut self, aperture: Box<dyn Aperture>) -> Self {
        self.aperture = Some(aperture);
        self
    }

    /// Sets the lattice position of the element entrance.
    #[must_use]
    pub fn at_position(mut self, position: f64) -> Self {
        self.position = position;
        self
    }

    /// Element name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `"<Type>.<name>"`, as used in reports and loss file names.
    #[must_use]
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.kind.type_name(), self.name)
    }

    /// Element length.
    #[must_use]
    pub fn length(&self) -> f64 {
        self.length
    }

    /// Lattice position of the element entrance.
    #[must_use]
    pub fn position(&self) -> f64 {
        self.position
    }

    /// Sets the lattice position of the element entrance.
    pub fn set_position(&mut self, position: f64) {
        self.position = position;
    }

    /// Element category.
    #[must_use]
    pub fn kind(&self) -> &ElementKind {
        &self.kind
    }

    /// Returns `true` if particles hitting this element may scatter
    /// rather than being removed at the aperture edge.
    #[must_use]
    pub fn is_scatter_capable(&self) -> bool {
        matches!(self.kind, ElementKind::Collimator)
            && self
                .aperture
                .as_deref()
                .is_some_and(|ap| ap.collimator().is_some())
    }

    /// Lens parameters if this element is a hollow electron lens.
    #[must_use]
    pub fn hollow_electron_lens(&self) -> Option<&HollowElectronLens> {
        match &self.kind {
            ElementKind::HollowElectronLens(lens) => Some(lens),
            _ => None,
        }
    }

    /// The element aperture, if any.
    #[must_use]
    pub fn aperture(&self) -> Option<&dyn Aperture> {
        self.aperture.as_deref()
    }

    /// Mutable access to the element aperture, if any.
    pub fn aperture_mut(&mut self) -> Option<&mut (dyn Aperture + 'static)> {
        self.aperture.as_deref_mut()
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} m at {} m)", self.qualified_name(), self.length, self.position)
    }
}
