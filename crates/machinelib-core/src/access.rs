use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction resources may move through a machine face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceFlow {
    Input,
    Output,
    Both,
}

impl ResourceFlow {
    pub const ALL: [ResourceFlow; 3] = [ResourceFlow::Input, ResourceFlow::Output, ResourceFlow::Both];

    /// Whether resources flowing as `self` are compatible with `other`.
    pub fn can_flow_in(self, other: ResourceFlow) -> bool {
        self == other || self == ResourceFlow::Both || other == ResourceFlow::Both
    }

    pub fn allows_input(self) -> bool {
        self != ResourceFlow::Output
    }

    pub fn allows_output(self) -> bool {
        self != ResourceFlow::Input
    }
}

/// Access policy of a slot group.
///
/// | type     | external insert | external extract | player insert |
/// |----------|-----------------|------------------|---------------|
/// | input    | yes             | no               | yes           |
/// | output   | no              | yes              | no            |
/// | storage  | yes             | yes              | yes           |
/// | transfer | no              | no               | yes           |
///
/// Players may always extract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputType {
    Input,
    Output,
    Storage,
    Transfer,
}

impl InputType {
    pub fn external_insertion(self) -> bool {
        matches!(self, InputType::Input | InputType::Storage)
    }

    pub fn external_extraction(self) -> bool {
        matches!(self, InputType::Output | InputType::Storage)
    }

    pub fn player_insertion(self) -> bool {
        self != InputType::Output
    }

    pub fn player_extraction(self) -> bool {
        true
    }

    /// The face flow that matches this policy, or `None` if external access
    /// is closed in both directions.
    pub fn external_flow(self) -> Option<ResourceFlow> {
        match (self.external_insertion(), self.external_extraction()) {
            (true, true) => Some(ResourceFlow::Both),
            (true, false) => Some(ResourceFlow::Input),
            (false, true) => Some(ResourceFlow::Output),
            (false, false) => None,
        }
    }
}

/// A named access policy, shared by every slot in a group.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SlotGroupType {
    name: String,
    input_type: InputType,
}

impl SlotGroupType {
    pub fn new(name: impl Into<String>, input_type: InputType) -> Self {
        Self {
            name: name.into(),
            input_type,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn input_type(&self) -> InputType {
        self.input_type
    }
}

impl fmt::Display for SlotGroupType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:?})", self.name, self.input_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_type_table() {
        use InputType::*;
        let table = [
            (Input, true, false, true),
            (Output, false, true, false),
            (Storage, true, true, true),
            (Transfer, false, false, true),
        ];
        for (ty, ext_in, ext_out, player_in) in table {
            assert_eq!(ty.external_insertion(), ext_in, "{ty:?}");
            assert_eq!(ty.external_extraction(), ext_out, "{ty:?}");
            assert_eq!(ty.player_insertion(), player_in, "{ty:?}");
            assert!(ty.player_extraction());
        }
    }

    #[test]
    fn external_flow_mapping() {
        assert_eq!(InputType::Storage.external_flow(), Some(ResourceFlow::Both));
        assert_eq!(InputType::Input.external_flow(), Some(ResourceFlow::Input));
        assert_eq!(InputType::Output.external_flow(), Some(ResourceFlow::Output));
        assert_eq!(InputType::Transfer.external_flow(), None);
    }

    #[test]
    fn can_flow_in_truth_table() {
        use ResourceFlow::*;
        assert!(Input.can_flow_in(Input));
        assert!(!Input.can_flow_in(Output));
        assert!(Input.can_flow_in(Both));
        assert!(Both.can_flow_in(Output));
        assert!(Output.can_flow_in(Output));
        assert!(!Output.can_flow_in(Input));
    }

    #[test]
    fn flow_direction_helpers() {
        assert!(ResourceFlow::Input.allows_input());
        assert!(!ResourceFlow::Input.allows_output());
        assert!(ResourceFlow::Both.allows_input() && ResourceFlow::Both.allows_output());
        assert!(!ResourceFlow::Output.allows_input());
    }

    #[test]
    fn group_type_display() {
        let t = SlotGroupType::new("fuel", InputType::Input);
        assert_eq!(t.to_string(), "fuel (Input)");
        assert_eq!(t.name(), "fuel");
    }
}
