//! A simple DC LED circuit: components are wired pin-to-pin by `connect`
//! actions and a `switch` action toggles a switch's position; the circuit is
//! re-solved after every action to decide which LEDs light up.
//!
//! Grounded in the usage pattern in `TestLedCircuit.cpp`'s `InitExperience`/
//! `InitElectronicCircuit`: components are configured from a text block
//! (`"PowerSupplyDC Battery 6000 50\nLED LED1 Red\n..."`), the `Default` role
//! succeeds when `LED1` is lit and `SW1` is `connected`/has two `connections`/
//! is in `position` `"1"`, and rewards penalize extra resistors
//! (`PropertyCountReward("Resistor", "connected", "true", -10)`) while
//! rewarding a battery wired directly to the switch's `In` pin
//! (`EntityCondition` + `RelationshipCondition("+", ..., ["SW1","In"])`).
//!
//! The actual component simulation (`SimplECircuitCybSys`) is a separate
//! plugin not present in the indexed source, so the continuity/short-circuit
//! solving below is this crate's own design: a graph of `(entity, pin)`
//! nodes, external `connect` edges, and per-component internal edges (a
//! resistor always conducts, a switch only when closed, an LED conducts but
//! is flagged separately so a path through it can be told apart from a bare
//! wire).

use dscenkit_core::{
    Action, CompOp, Condition, EntityCondition, EntityStateType, EnvironmentState,
    Model, PropertyCondition, PropertyCountReward, RelationshipCondition, RoleInfo, StateResult,
    StateRewardRules,
};
use dscenkit_env::{CyberSystem, EnvError, EnvResult};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::Arc;

const LED_SAFE_CURRENT_MA: f64 = 30.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ComponentKind {
    PowerSupply,
    Led,
    Resistor,
    Switch,
}

impl ComponentKind {
    fn type_name(self) -> &'static str {
        match self {
            ComponentKind::PowerSupply => "PowerSupplyDC",
            ComponentKind::Led => "LED",
            ComponentKind::Resistor => "Resistor",
            ComponentKind::Switch => "Switch",
        }
    }

    fn pins(self) -> &'static [&'static str] {
        match self {
            ComponentKind::PowerSupply => &["+", "-"],
            ComponentKind::Led => &["Anode", "Cathode"],
            ComponentKind::Resistor => &["Pin1", "Pin2"],
            ComponentKind::Switch => &["In", "Out1"],
        }
    }

    fn from_str(s: &str) -> Option<Self> {
        match s {
            "PowerSupplyDC" => Some(ComponentKind::PowerSupply),
            "LED" => Some(ComponentKind::Led),
            "Resistor" => Some(ComponentKind::Resistor),
            "Switch" => Some(ComponentKind::Switch),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
struct Component {
    id: String,
    kind: ComponentKind,
    properties: BTreeMap<String, String>,
    links: HashMap<String, (String, String)>,
}

impl Component {
    fn new(id: impl Into<String>, kind: ComponentKind) -> Self {
        Self {
            id: id.into(),
            kind,
            properties: BTreeMap::new(),
            links: HashMap::new(),
        }
    }
}

pub struct LedCircuit {
    components: BTreeMap<String, Component>,
    initialized: bool,
}

impl LedCircuit {
    pub fn new() -> Self {
        Self {
            components: BTreeMap::new(),
            initialized: false,
        }
    }

    fn resolve(&mut self) {
        for component in self.components.values_mut() {
            let connections = component.links.len();
            component
                .properties
                .insert("connections".to_string(), connections.to_string());
            component
                .properties
                .insert("connected".to_string(), (connections > 0).to_string());
            if matches!(component.kind, ComponentKind::Led) {
                component.properties.insert("lit_up".to_string(), "false".to_string());
                component.properties.insert("burnt_out".to_string(), "false".to_string());
            }
        }
        for id in self.components.keys().cloned().collect::<Vec<_>>() {
            if self.components[&id].kind == ComponentKind::PowerSupply {
                self.components
                    .get_mut(&id)
                    .unwrap()
                    .properties
                    .insert("burnt_out".to_string(), "false".to_string());
            }
        }

        let Some(battery_id) = self.find_battery() else {
            return;
        };
        let Some(path) = self.trace_path(&battery_id, "+", &battery_id, "-") else {
            return;
        };

        let voltage_mv: f64 = self.components[&battery_id]
            .properties
            .get("voltage_mv")
            .and_then(|v| v.parse().ok())
            .unwrap_or(0.0);

        let mut resistance_ohm = 0.0;
        let mut leds_in_path: Vec<String> = Vec::new();
        for window in path.windows(2) {
            let (entity_a, _) = &window[0];
            let (entity_b, _) = &window[1];
            if entity_a != entity_b {
                continue;
            }
            let component = &self.components[entity_a];
            match component.kind {
                ComponentKind::Resistor => {
                    resistance_ohm += component
                        .properties
                        .get("resistance_ohm")
                        .and_then(|v| v.parse::<f64>().ok())
                        .unwrap_or(0.0);
                }
                ComponentKind::Led => leds_in_path.push(entity_a.clone()),
                _ => {}
            }
        }

        if leds_in_path.is_empty() {
            if resistance_ohm <= 0.0 {
                if let Some(battery) = self.components.get_mut(&battery_id) {
                    battery.properties.insert("burnt_out".to_string(), "true".to_string());
                }
            }
            return;
        }

        let current_ma = if resistance_ohm > 0.0 {
            voltage_mv / resistance_ohm
        } else {
            f64::INFINITY
        };

        for led_id in leds_in_path {
            let led = self.components.get_mut(&led_id).unwrap();
            if resistance_ohm <= 0.0 || current_ma > LED_SAFE_CURRENT_MA {
                led.properties.insert("burnt_out".to_string(), "true".to_string());
            } else {
                led.properties.insert("lit_up".to_string(), "true".to_string());
            }
        }
    }

    fn find_battery(&self) -> Option<String> {
        self.components
            .values()
            .find(|c| c.kind == ComponentKind::PowerSupply)
            .map(|c| c.id.clone())
    }

    /// BFS over `(entity, pin)` nodes: external wires plus each component's
    /// internal edge (a closed switch, a resistor, an LED; a power supply
    /// has none, it is only ever a path endpoint). Returns the node sequence
    /// of the first path found.
    fn trace_path(
        &self,
        from_entity: &str,
        from_pin: &str,
        to_entity: &str,
        to_pin: &str,
    ) -> Option<Vec<(String, String)>> {
        let start = (from_entity.to_string(), from_pin.to_string());
        let goal = (to_entity.to_string(), to_pin.to_string());

        let mut visited = HashSet::new();
        let mut parent: HashMap<(String, String), (String, String)> = HashMap::new();
        let mut queue = VecDeque::new();
        queue.push_back(start.clone());
        visited.insert(start.clone());

        while let Some(node) = queue.pop_front() {
            if node == goal {
                let mut path = vec![node.clone()];
                let mut cur = node;
                while let Some(prev) = parent.get(&cur) {
                    path.push(prev.clone());
                    cur = prev.clone();
                }
                path.reverse();
                return Some(path);
            }
            for next in self.neighbors(&node) {
                if visited.insert(next.clone()) {
                    parent.insert(next.clone(), node.clone());
                    queue.push_back(next);
                }
            }
        }
        None
    }

    fn neighbors(&self, node: &(String, String)) -> Vec<(String, String)> {
        let (entity_id, pin) = node;
        let mut result = Vec::new();
        if let Some(component) = self.components.get(entity_id) {
            if let Some((target_entity, target_pin)) = component.links.get(pin) {
                result.push((target_entity.clone(), target_pin.clone()));
            }
            match component.kind {
                ComponentKind::Resistor | ComponentKind::Led => {
                    for other_pin in component.kind.pins() {
                        if other_pin != pin {
                            result.push((entity_id.clone(), other_pin.to_string()));
                        }
                    }
                }
                ComponentKind::Switch => {
                    let closed = component.properties.get("position").map(String::as_str) == Some("1");
                    if closed {
                        for other_pin in component.kind.pins() {
                            if other_pin != pin {
                                result.push((entity_id.clone(), other_pin.to_string()));
                            }
                        }
                    }
                }
                ComponentKind::PowerSupply => {}
            }
        }
        result
    }

    fn entity_state_type(kind: ComponentKind, model_name: &str) -> EntityStateType {
        let mut defaults = BTreeMap::new();
        defaults.insert("connected".to_string(), "false".to_string());
        defaults.insert("connections".to_string(), "0".to_string());
        match kind {
            ComponentKind::PowerSupply => {
                defaults.insert("voltage_mv".to_string(), "0".to_string());
                defaults.insert("rating_ma".to_string(), "0".to_string());
                defaults.insert("burnt_out".to_string(), "false".to_string());
            }
            ComponentKind::Led => {
                defaults.insert("color".to_string(), "Red".to_string());
                defaults.insert("lit_up".to_string(), "false".to_string());
                defaults.insert("burnt_out".to_string(), "false".to_string());
            }
            ComponentKind::Resistor => {
                defaults.insert("resistance_ohm".to_string(), "0".to_string());
                defaults.insert("max_power_mw".to_string(), "0".to_string());
            }
            ComponentKind::Switch => {
                defaults.insert("position".to_string(), "0".to_string());
                defaults.insert("rating_mv".to_string(), "0".to_string());
                defaults.insert("rating_ma".to_string(), "0".to_string());
            }
        }
        EntityStateType::new(kind.type_name(), model_name, defaults, BTreeMap::new(), vec![])
            .expect("no possible-value keys to violate")
    }
}

impl Default for LedCircuit {
    fn default() -> Self {
        Self::new()
    }
}

impl CyberSystem for LedCircuit {
    fn system_name(&self) -> &str {
        "led-circuit"
    }

    fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn initialize(&mut self, model: &Arc<Model>, force: bool) -> EnvResult<()> {
        if self.initialized && !force {
            return Ok(());
        }
        for kind in [
            ComponentKind::PowerSupply,
            ComponentKind::Led,
            ComponentKind::Resistor,
            ComponentKind::Switch,
        ] {
            model.register_entity_state_type(Self::entity_state_type(kind, "led-circuit"));
        }
        self.initialized = true;
        Ok(())
    }

    fn init_roles(&mut self, model: &Arc<Model>) -> EnvResult<()> {
        let lit_up = PropertyCondition::new("lit_up", CompOp::Equal, "true");
        let connected = PropertyCondition::new("connected", CompOp::Equal, "true");
        let two_connections = PropertyCondition::new("connections", CompOp::Equal, "2");
        let switch_on = PropertyCondition::new("position", CompOp::Equal, "1");

        let success = Condition::new()
            .add_entity_condition(EntityCondition::new("LED1").with_property(lit_up))
            .add_condition(
                dscenkit_core::LogicOp::And,
                Condition::new().add_entity_condition(
                    EntityCondition::new("SW1")
                        .with_property(connected)
                        .with_property(two_connections)
                        .with_property(switch_on),
                ),
            );

        let battery_to_switch = EntityCondition::new("Battery").with_relationship(
            RelationshipCondition::new("+", CompOp::Equal, "SW1"),
        );

        let rewards = StateRewardRules::new()
            .with_result_reward(StateResult::InProgress, -1.0)
            .with_result_reward(StateResult::Succeeded, 5000.0)
            .with_result_reward(StateResult::Failed, -1000.0)
            .with_result_reward(StateResult::Deadlock, -500.0)
            .with_property_count_reward(PropertyCountReward {
                type_name: "Resistor".to_string(),
                property: "connected".to_string(),
                value: "true".to_string(),
                reward_per_count: -10.0,
            })
            .with_entity_condition_reward(battery_to_switch, 20.0);

        model.register_role(RoleInfo::new(
            "Default",
            success,
            Condition::new(),
            Condition::new(),
            rewards,
        ));
        Ok(())
    }

    fn reset_system(&mut self) {
        for component in self.components.values_mut() {
            component.links.clear();
        }
    }

    fn initial_system_state(&self) -> EnvironmentState {
        self.interpret_system_state()
    }

    fn execute_action(&mut self, action: &Action) -> EnvResult<bool> {
        match action.type_id.as_str() {
            "connect" if action.params.len() == 4 => {
                let (entity_a, pin_a, entity_b, pin_b) = (
                    action.params[0].clone(),
                    action.params[1].clone(),
                    action.params[2].clone(),
                    action.params[3].clone(),
                );
                if !self.pin_is_free(&entity_a, &pin_a) || !self.pin_is_free(&entity_b, &pin_b) {
                    return Ok(false);
                }
                let (Some(_), Some(_)) = (
                    self.components.get(&entity_a),
                    self.components.get(&entity_b),
                ) else {
                    return Ok(false);
                };
                self.components
                    .get_mut(&entity_a)
                    .unwrap()
                    .links
                    .insert(pin_a.clone(), (entity_b.clone(), pin_b.clone()));
                self.components
                    .get_mut(&entity_b)
                    .unwrap()
                    .links
                    .insert(pin_b, (entity_a, pin_a));
                self.resolve();
                Ok(true)
            }
            "switch" if action.params.len() == 2 => {
                let entity_id = &action.params[0];
                let position = &action.params[1];
                let Some(component) = self.components.get_mut(entity_id) else {
                    return Ok(false);
                };
                if component.kind != ComponentKind::Switch || (position != "0" && position != "1") {
                    return Ok(false);
                }
                component
                    .properties
                    .insert("position".to_string(), position.clone());
                self.resolve();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn interpret_system_state(&self) -> EnvironmentState {
        let mut state = EnvironmentState::new();
        for component in self.components.values() {
            let state_type = Arc::new(Self::entity_state_type(component.kind, "led-circuit"));
            let mut entity = dscenkit_core::EntityState::from_defaults(state_type);
            for (key, value) in &component.properties {
                let _ = entity.set_property(key, value.clone());
            }
            for (pin, (target_entity, target_pin)) in &component.links {
                entity.set_relationship(pin, target_entity, target_pin);
            }
            state.set_entity(component.id.clone(), Arc::new(entity));
        }
        state
    }

    fn available_actions(&self, _smart: bool) -> Vec<Action> {
        let mut actions = Vec::new();
        let free_pins: Vec<(String, String)> = self
            .components
            .values()
            .flat_map(|c| {
                c.kind
                    .pins()
                    .iter()
                    .filter(move |pin| !c.links.contains_key(**pin))
                    .map(move |pin| (c.id.clone(), pin.to_string()))
            })
            .collect();
        for i in 0..free_pins.len() {
            for j in 0..free_pins.len() {
                if free_pins[i].0 == free_pins[j].0 {
                    continue;
                }
                actions.push(Action::new(
                    "connect",
                    vec![
                        free_pins[i].0.clone(),
                        free_pins[i].1.clone(),
                        free_pins[j].0.clone(),
                        free_pins[j].1.clone(),
                    ],
                ));
            }
        }
        for component in self.components.values() {
            if component.kind == ComponentKind::Switch {
                actions.push(Action::new("switch", vec![component.id.clone(), "0".to_string()]));
                actions.push(Action::new("switch", vec![component.id.clone(), "1".to_string()]));
            }
        }
        actions
    }

    fn failure_condition(&self) -> Condition {
        Condition::new()
    }

    fn system_info(&self, info_id: &str) -> EnvResult<String> {
        if !info_id.is_empty() {
            return Err(EnvError::UnknownInfoId(info_id.to_string()));
        }
        let mut out = String::new();
        for component in self.components.values() {
            out.push_str(&format!("{} ({:?})", component.id, component.kind));
            for (pin, (target_entity, target_pin)) in &component.links {
                out.push_str(&format!(" {}->{}.{}", pin, target_entity, target_pin));
            }
            for (key, value) in &component.properties {
                out.push_str(&format!(" {}={}", key, value));
            }
            out.push('\n');
        }
        Ok(out)
    }

    fn set_configuration(&mut self, configuration: &str) -> EnvResult<()> {
        self.components.clear();
        for line in configuration.lines() {
            let tokens: Vec<&str> = line.split_whitespace().collect();
            if tokens.is_empty() {
                continue;
            }
            let Some(kind) = ComponentKind::from_str(tokens[0]) else {
                return Err(EnvError::InvalidConfiguration {
                    system: "led-circuit".to_string(),
                    reason: format!("unknown component kind '{}'", tokens[0]),
                });
            };
            let Some(&id) = tokens.get(1) else {
                return Err(EnvError::InvalidConfiguration {
                    system: "led-circuit".to_string(),
                    reason: "missing component id".to_string(),
                });
            };
            let mut component = Component::new(id, kind);
            match kind {
                ComponentKind::PowerSupply => {
                    component
                        .properties
                        .insert("voltage_mv".to_string(), tokens.get(2).unwrap_or(&"0").to_string());
                    component
                        .properties
                        .insert("rating_ma".to_string(), tokens.get(3).unwrap_or(&"0").to_string());
                }
                ComponentKind::Led => {
                    component
                        .properties
                        .insert("color".to_string(), tokens.get(2).unwrap_or(&"Red").to_string());
                }
                ComponentKind::Resistor => {
                    component.properties.insert(
                        "resistance_ohm".to_string(),
                        tokens.get(2).unwrap_or(&"0").to_string(),
                    );
                    component.properties.insert(
                        "max_power_mw".to_string(),
                        tokens.get(3).unwrap_or(&"0").to_string(),
                    );
                }
                ComponentKind::Switch => {
                    component
                        .properties
                        .insert("position".to_string(), "0".to_string());
                    component
                        .properties
                        .insert("rating_mv".to_string(), tokens.get(2).unwrap_or(&"0").to_string());
                    component
                        .properties
                        .insert("rating_ma".to_string(), tokens.get(3).unwrap_or(&"0").to_string());
                }
            }
            self.components.insert(id.to_string(), component);
        }
        Ok(())
    }

    fn get_configuration(&self) -> EnvResult<String> {
        let mut out = String::new();
        for component in self.components.values() {
            out.push_str(component.kind.type_name());
            out.push(' ');
            out.push_str(&component.id);
            match component.kind {
                ComponentKind::PowerSupply => {
                    out.push_str(&format!(
                        " {} {}",
                        component.properties.get("voltage_mv").map(String::as_str).unwrap_or("0"),
                        component.properties.get("rating_ma").map(String::as_str).unwrap_or("0"),
                    ));
                }
                ComponentKind::Led => {
                    out.push_str(&format!(
                        " {}",
                        component.properties.get("color").map(String::as_str).unwrap_or("Red"),
                    ));
                }
                ComponentKind::Resistor => {
                    out.push_str(&format!(
                        " {} {}",
                        component.properties.get("resistance_ohm").map(String::as_str).unwrap_or("0"),
                        component.properties.get("max_power_mw").map(String::as_str).unwrap_or("0"),
                    ));
                }
                ComponentKind::Switch => {
                    out.push_str(&format!(
                        " {} {}",
                        component.properties.get("rating_mv").map(String::as_str).unwrap_or("0"),
                        component.properties.get("rating_ma").map(String::as_str).unwrap_or("0"),
                    ));
                }
            }
            out.push('\n');
        }
        Ok(out)
    }
}

impl LedCircuit {
    fn pin_is_free(&self, entity_id: &str, pin: &str) -> bool {
        match self.components.get(entity_id) {
            Some(component) => {
                component.kind.pins().contains(&pin) && !component.links.contains_key(pin)
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dscenkit_core::{get_model, remove_all_models};

    const CONFIG: &str = "PowerSupplyDC Battery 6000 50\nLED LED1 Red\nResistor R1 2200 500\nSwitch SW1 12000 40\n";

    fn built_circuit(name: &str) -> LedCircuit {
        let model = get_model(name);
        let mut system = LedCircuit::new();
        system.initialize(&model, true).unwrap();
        system.init_roles(&model).unwrap();
        system.set_configuration(CONFIG).unwrap();
        system.reset_system();
        system
    }

    #[test]
    fn get_configuration_round_trips_through_set_configuration() {
        let mut system = LedCircuit::new();
        system.set_configuration(CONFIG).unwrap();
        assert_eq!(system.get_configuration().unwrap(), CONFIG);
    }

    #[test]
    fn complete_loop_lights_the_led() {
        let mut system = built_circuit("led-circuit-success-test");
        system
            .execute_action(&Action::new("connect", vec!["Battery".into(), "+".into(), "SW1".into(), "In".into()]))
            .unwrap();
        system
            .execute_action(&Action::new("connect", vec!["SW1".into(), "Out1".into(), "R1".into(), "Pin1".into()]))
            .unwrap();
        system
            .execute_action(&Action::new("connect", vec!["R1".into(), "Pin2".into(), "LED1".into(), "Anode".into()]))
            .unwrap();
        system
            .execute_action(&Action::new("connect", vec!["LED1".into(), "Cathode".into(), "Battery".into(), "-".into()]))
            .unwrap();
        system
            .execute_action(&Action::new("switch", vec!["SW1".into(), "1".into()]))
            .unwrap();

        let state = system.interpret_system_state();
        assert_eq!(state.entity("LED1").unwrap().property("lit_up"), Some("true"));
        assert_eq!(state.entity("SW1").unwrap().property("connections"), Some("2"));
        remove_all_models();
    }

    #[test]
    fn direct_short_burns_the_battery() {
        let mut system = built_circuit("led-circuit-short-test");
        system
            .execute_action(&Action::new("connect", vec!["Battery".into(), "+".into(), "Battery".into(), "-".into()]))
            .unwrap();
        let state = system.interpret_system_state();
        assert_eq!(state.entity("Battery").unwrap().property("burnt_out"), Some("true"));
        remove_all_models();
    }

    #[test]
    fn already_connected_pin_is_rejected() {
        let mut system = built_circuit("led-circuit-reject-test");
        assert!(system
            .execute_action(&Action::new("connect", vec!["Battery".into(), "+".into(), "SW1".into(), "In".into()]))
            .unwrap());
        assert!(!system
            .execute_action(&Action::new("connect", vec!["Battery".into(), "+".into(), "R1".into(), "Pin1".into()]))
            .unwrap());
        remove_all_models();
    }
}
