//! Proptest generators for property-based testing.

use proptest::prelude::*;

use keyward_core::{Descriptor, GateOp, Level, Scalar, LEVEL_ATTR};

/// Generate an attribute value.
pub fn scalar() -> impl Strategy<Value = Scalar> {
    prop_oneof![
        Just(Scalar::Null),
        any::<bool>().prop_map(Scalar::Bool),
        (-1000i64..=1000).prop_map(Scalar::Int),
        "[a-z0-9]{0,8}".prop_map(Scalar::Text),
    ]
}

/// Generate an attribute name. Never `level`.
pub fn attr_name() -> impl Strategy<Value = String> {
    "[a-z][a-z_]{0,7}".prop_filter("level is not an identity attribute", |name| {
        name != LEVEL_ATTR
    })
}

/// Generate a descriptor with 1 to `max_attrs` attributes.
pub fn descriptor(max_attrs: usize) -> impl Strategy<Value = Descriptor> {
    prop::collection::vec((attr_name(), scalar()), 1..=max_attrs.max(1))
        .prop_map(|attrs| attrs.into_iter().collect())
}

/// Generate a storable level (0 through 3).
pub fn storable_level() -> impl Strategy<Value = Level> {
    (0i64..=3).prop_map(Level)
}

/// Generate any level an assignment may carry, revocations included.
pub fn level() -> impl Strategy<Value = Level> {
    (-1i64..=3).prop_map(Level)
}

/// Generate a requester level as the gate sees it.
pub fn requester_level() -> impl Strategy<Value = Level> {
    (0i64..=9).prop_map(Level)
}

/// Generate text that cannot contain a marker.
pub fn plain_text() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 .:;{}()=\n]{0,32}".prop_map(String::from)
}

/// Generate a gate operator.
pub fn gate_op() -> impl Strategy<Value = GateOp> {
    prop_oneof![Just(GateOp::Greater), Just(GateOp::Less)]
}

/// One piece of a generated gated source.
#[derive(Debug, Clone)]
pub enum GatePart {
    Text(String),
    Block {
        op: GateOp,
        threshold: u8,
        body: String,
    },
}

/// A source text built from known parts, so the gate output can be predicted.
#[derive(Debug, Clone)]
pub struct GatedSource {
    pub parts: Vec<GatePart>,
}

impl GatedSource {
    /// The source text with markers.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for part in &self.parts {
            match part {
                GatePart::Text(text) => out.push_str(text),
                GatePart::Block {
                    op,
                    threshold,
                    body,
                } => {
                    let op = match op {
                        GateOp::Greater => '>',
                        GateOp::Less => '<',
                    };
                    out.push_str(&format!("/*ACL{}{}*/{}/*ENDACL*/", op, threshold, body));
                }
            }
        }
        out
    }

    /// What the gate must produce for a requester at `level`.
    pub fn expected(&self, level: Level) -> String {
        let mut out = String::new();
        for part in &self.parts {
            match part {
                GatePart::Text(text) => out.push_str(text),
                GatePart::Block {
                    op,
                    threshold,
                    body,
                } => {
                    if op.admits(level, *threshold) {
                        out.push_str(body);
                    }
                }
            }
        }
        out
    }
}

fn gate_part() -> impl Strategy<Value = GatePart> {
    prop_oneof![
        plain_text().prop_map(GatePart::Text),
        (gate_op(), 0u8..=9, plain_text()).prop_map(|(op, threshold, body)| GatePart::Block {
            op,
            threshold,
            body
        }),
    ]
}

impl Arbitrary for GatedSource {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        prop::collection::vec(gate_part(), 0..8)
            .prop_map(|parts| GatedSource { parts })
            .boxed()
    }
}

/// Parameters for one assignment.
#[derive(Debug, Clone)]
pub struct GrantParams {
    pub entity: Descriptor,
    pub resource: Descriptor,
    pub level: Level,
}

impl Arbitrary for GrantParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            "[a-z0-9]{1,8}",      // account id
            "[a-z0-9]{1,8}",      // doc id
            storable_level(),
        )
            .prop_map(|(account, doc, level)| GrantParams {
                entity: Descriptor::single("account", account),
                resource: Descriptor::single("doc", doc),
                level,
            })
            .boxed()
    }
}
