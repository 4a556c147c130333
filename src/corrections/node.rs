//! Chain nodes and provenance naming

/// Position of a node in its [`CorrectionChain`](super::CorrectionChain).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub const fn index(self) -> usize {
        self.0
    }
}

/// Declares a node id that can only refer to one kind of node, so that
/// finalisation cannot be called with the wrong strategy.
macro_rules! typed_node_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name(pub(crate) NodeId);

        impl $name {
            pub const fn id(self) -> NodeId {
                self.0
            }
        }

        impl From<$name> for NodeId {
            fn from(typed: $name) -> Self {
                typed.0
            }
        }
    };
}

typed_node_id!(
    /// Chain root
    SourceId
);
typed_node_id!(
    /// Correction producing a wind-speed column
    WindSpeedId
);
typed_node_id!(
    /// Correction producing a power column
    PowerId
);

/// What a correction's finalisation writes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Produces {
    WindSpeed,
    Power,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Source,
    Correction(Produces),
}

/// Chain metadata for one stage.
#[derive(Debug, Clone)]
pub struct CorrectionNode {
    pub(crate) parent: Option<NodeId>,
    pub(crate) kind: NodeKind,
    /// Correction labels from the root down to this node
    pub(crate) stages: Vec<String>,
    pub(crate) correction_name: Option<String>,
    pub(crate) wind_speed_column: Option<String>,
    pub(crate) power_column: Option<String>,
}

impl CorrectionNode {
    pub const fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub const fn kind(&self) -> NodeKind {
        self.kind
    }

    pub const fn is_raw(&self) -> bool {
        matches!(self.kind, NodeKind::Source)
    }

    /// Sources count as wind-speed based.
    pub const fn is_wind_speed_based(&self) -> bool {
        matches!(
            self.kind,
            NodeKind::Source | NodeKind::Correction(Produces::WindSpeed)
        )
    }

    pub const fn is_power_based(&self) -> bool {
        !self.is_wind_speed_based()
    }

    /// Labels of every correction applied to reach this node, oldest first.
    pub fn stages(&self) -> &[String] {
        &self.stages
    }

    /// Composite provenance name. `None` for sources.
    pub fn correction_name(&self) -> Option<&str> {
        self.correction_name.as_deref()
    }

    pub fn wind_speed_column(&self) -> Option<&str> {
        self.wind_speed_column.as_deref()
    }

    /// Set once the node has been finalised with a power curve (or, for
    /// power-based corrections, at construction).
    pub fn power_column(&self) -> Option<&str> {
        self.power_column.as_deref()
    }

    /// Name used when this node appears in messages.
    pub fn display_name(&self) -> String {
        match (&self.correction_name, &self.wind_speed_column) {
            (Some(name), _) => name.clone(),
            (None, Some(column)) => format!("Source ({column})"),
            (None, None) => "Source".to_string(),
        }
    }
}

/// Join stage labels into a provenance name.
///
/// The last label is joined with `" & "`, every earlier one with `", "`:
/// `Density`, `Density & Turbulence`, `Density, REWS & Turbulence`.
pub fn compose_name<S: AsRef<str>>(stages: &[S]) -> String {
    match stages {
        [] => String::new(),
        [only] => only.as_ref().to_string(),
        [earlier @ .., last] => {
            let head: Vec<&str> = earlier.iter().map(|s| s.as_ref()).collect();
            format!("{} & {}", head.join(", "), last.as_ref())
        }
    }
}
