// Narrow surface a scripting layer talks to.
//
// Component fields are addressed by (component name, field name) strings and
// carried as `FieldValue`s; behaviours are closures registered by name.
// Whatever embeds a script language sits on the other side of this trait.

use bevy_ecs::prelude::*;
use glam::Vec3;

use super::components::{Agent, Health, Navigator, Transform, Velocity};
use super::error::BridgeError;
use super::world::WorldState;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue {
    Float(f32),
    Int(i64),
    Vec3(Vec3),
    Bool(bool),
}

impl FieldValue {
    fn as_float(self, field: &str) -> Result<f32, BridgeError> {
        match self {
            FieldValue::Float(v) => Ok(v),
            FieldValue::Int(v) => Ok(v as f32),
            _ => Err(mismatch(field, "float")),
        }
    }

    fn as_int(self, field: &str) -> Result<i64, BridgeError> {
        match self {
            FieldValue::Int(v) => Ok(v),
            _ => Err(mismatch(field, "int")),
        }
    }

    fn as_vec3(self, field: &str) -> Result<Vec3, BridgeError> {
        match self {
            FieldValue::Vec3(v) => Ok(v),
            _ => Err(mismatch(field, "vec3")),
        }
    }
}

fn mismatch(field: &str, expected: &'static str) -> BridgeError {
    BridgeError::TypeMismatch {
        field: field.to_string(),
        expected,
    }
}

fn unknown_field(component: &str, field: &str) -> BridgeError {
    BridgeError::UnknownField {
        component: component.to_string(),
        field: field.to_string(),
    }
}

pub trait ScriptBridge {
    fn get_component_field(
        &self,
        entity: Entity,
        component: &str,
        field: &str,
    ) -> Result<FieldValue, BridgeError>;

    fn set_component_field(
        &mut self,
        entity: Entity,
        component: &str,
        field: &str,
        value: FieldValue,
    ) -> Result<(), BridgeError>;

    fn invoke_behaviour(&mut self, entity: Entity, name: &str) -> Result<(), BridgeError>;
}

impl WorldState {
    pub fn register_behaviour(
        &mut self,
        name: impl Into<String>,
        behaviour: impl FnMut(&mut World, Entity) + Send + 'static,
    ) {
        self.behaviours.insert(name.into(), Box::new(behaviour));
    }

    fn ensure_entity(&self, entity: Entity) -> Result<(), BridgeError> {
        if self.world.entities().contains(entity) {
            Ok(())
        } else {
            Err(BridgeError::NoSuchEntity(format!("{entity:?}")))
        }
    }
}

/// Fetches component `T` or reports it missing under `name`.
fn component<'w, T: Component>(
    world: &'w World,
    entity: Entity,
    name: &str,
) -> Result<&'w T, BridgeError> {
    world
        .get::<T>(entity)
        .ok_or_else(|| BridgeError::MissingComponent(name.to_string()))
}

fn component_mut<'w, T: Component>(
    world: &'w mut World,
    entity: Entity,
    name: &str,
) -> Result<Mut<'w, T>, BridgeError> {
    world
        .get_mut::<T>(entity)
        .ok_or_else(|| BridgeError::MissingComponent(name.to_string()))
}

impl ScriptBridge for WorldState {
    fn get_component_field(
        &self,
        entity: Entity,
        component_name: &str,
        field: &str,
    ) -> Result<FieldValue, BridgeError> {
        self.ensure_entity(entity)?;
        let world = &self.world;
        match component_name {
            "Transform" => {
                let t = component::<Transform>(world, entity, component_name)?;
                match field {
                    "position" => Ok(FieldValue::Vec3(t.position)),
                    "yaw" => Ok(FieldValue::Float(t.yaw)),
                    _ => Err(unknown_field(component_name, field)),
                }
            }
            "Velocity" => {
                let v = component::<Velocity>(world, entity, component_name)?;
                match field {
                    "linear" => Ok(FieldValue::Vec3(v.linear)),
                    _ => Err(unknown_field(component_name, field)),
                }
            }
            "Navigator" => {
                let n = component::<Navigator>(world, entity, component_name)?;
                match field {
                    "speed" => Ok(FieldValue::Float(n.speed)),
                    "field_id" => Ok(FieldValue::Int(n.field_id as i64)),
                    _ => Err(unknown_field(component_name, field)),
                }
            }
            "Health" => {
                let h = component::<Health>(world, entity, component_name)?;
                match field {
                    "current" => Ok(FieldValue::Float(h.current)),
                    "max" => Ok(FieldValue::Float(h.max)),
                    "dead" => Ok(FieldValue::Bool(h.is_dead())),
                    _ => Err(unknown_field(component_name, field)),
                }
            }
            "Agent" => {
                let a = component::<Agent>(world, entity, component_name)?;
                match field {
                    "radius" => Ok(FieldValue::Float(a.radius)),
                    _ => Err(unknown_field(component_name, field)),
                }
            }
            _ => Err(BridgeError::UnknownComponent(component_name.to_string())),
        }
    }

    fn set_component_field(
        &mut self,
        entity: Entity,
        component_name: &str,
        field: &str,
        value: FieldValue,
    ) -> Result<(), BridgeError> {
        self.ensure_entity(entity)?;
        let world = &mut self.world;
        match (component_name, field) {
            ("Transform", "position") => {
                component_mut::<Transform>(world, entity, component_name)?.position =
                    value.as_vec3(field)?;
            }
            ("Transform", "yaw") => {
                component_mut::<Transform>(world, entity, component_name)?.yaw =
                    value.as_float(field)?;
            }
            ("Velocity", "linear") => {
                component_mut::<Velocity>(world, entity, component_name)?.linear =
                    value.as_vec3(field)?;
            }
            ("Navigator", "speed") => {
                component_mut::<Navigator>(world, entity, component_name)?.speed =
                    value.as_float(field)?;
            }
            ("Navigator", "field_id") => {
                let id = u32::try_from(value.as_int(field)?).map_err(|_| mismatch(field, "u32"))?;
                component_mut::<Navigator>(world, entity, component_name)?.field_id = id;
            }
            ("Health", "current") => {
                component_mut::<Health>(world, entity, component_name)?.current =
                    value.as_float(field)?;
            }
            ("Health", "max") => {
                component_mut::<Health>(world, entity, component_name)?.max =
                    value.as_float(field)?;
            }
            ("Agent", "radius") => {
                component_mut::<Agent>(world, entity, component_name)?.radius =
                    value.as_float(field)?;
            }
            ("Transform" | "Velocity" | "Navigator" | "Health" | "Agent", _) => {
                return Err(unknown_field(component_name, field));
            }
            _ => return Err(BridgeError::UnknownComponent(component_name.to_string())),
        }
        Ok(())
    }

    fn invoke_behaviour(&mut self, entity: Entity, name: &str) -> Result<(), BridgeError> {
        self.ensure_entity(entity)?;
        let behaviour = self
            .behaviours
            .get_mut(name)
            .ok_or_else(|| BridgeError::UnknownBehaviour(name.to_string()))?;
        behaviour(&mut self.world, entity);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::components::LevelClass;
    use crate::engine::config::SimConfig;
    use glam::Vec2;

    fn state_with_agent() -> (WorldState, Entity) {
        let mut state = WorldState::new(SimConfig {
            rng_seed: Some(3),
            ..Default::default()
        })
        .unwrap();
        let e = state.spawn_agent_at(Vec2::new(1.0, 2.0), 5);
        (state, e)
    }

    #[test]
    fn reads_component_fields() {
        let (state, e) = state_with_agent();
        assert_eq!(
            state.get_component_field(e, "Transform", "position"),
            Ok(FieldValue::Vec3(Vec3::new(1.0, 0.0, 2.0)))
        );
        assert_eq!(state.get_component_field(e, "Navigator", "field_id"), Ok(FieldValue::Int(5)));
        assert_eq!(state.get_component_field(e, "Health", "dead"), Ok(FieldValue::Bool(false)));
    }

    #[test]
    fn writes_component_fields() {
        let (mut state, e) = state_with_agent();
        state
            .set_component_field(e, "Navigator", "speed", FieldValue::Float(4.5))
            .unwrap();
        state
            .set_component_field(e, "Navigator", "field_id", FieldValue::Int(2))
            .unwrap();
        let nav = state.world.get::<Navigator>(e).unwrap();
        assert_eq!((nav.speed, nav.field_id), (4.5, 2));
    }

    #[test]
    fn reports_bad_addresses() {
        let (mut state, e) = state_with_agent();
        assert_eq!(
            state.get_component_field(e, "Sprite", "frame"),
            Err(BridgeError::UnknownComponent("Sprite".into()))
        );
        assert!(matches!(
            state.get_component_field(e, "Health", "armour"),
            Err(BridgeError::UnknownField { .. })
        ));
        assert!(matches!(
            state.set_component_field(e, "Transform", "position", FieldValue::Float(1.0)),
            Err(BridgeError::TypeMismatch { expected: "vec3", .. })
        ));
        assert!(matches!(
            state.set_component_field(e, "Navigator", "field_id", FieldValue::Int(-1)),
            Err(BridgeError::TypeMismatch { .. })
        ));

        let level = state.spawn_level_piece(Vec2::ZERO, Vec2::ONE, LevelClass::Walkable);
        assert_eq!(
            state.get_component_field(level, "Health", "current"),
            Err(BridgeError::MissingComponent("Health".into()))
        );

        state.world.despawn(e);
        assert!(matches!(
            state.get_component_field(e, "Health", "current"),
            Err(BridgeError::NoSuchEntity(_))
        ));
    }

    #[test]
    fn invokes_registered_behaviours() {
        let (mut state, e) = state_with_agent();
        state.register_behaviour("stop", |world: &mut World, entity: Entity| {
            if let Some(mut v) = world.get_mut::<Velocity>(entity) {
                v.linear = Vec3::ZERO;
            }
            if let Some(mut h) = world.get_mut::<Health>(entity) {
                h.current = 0.5;
            }
        });
        state.world.get_mut::<Velocity>(e).unwrap().linear = Vec3::X;

        state.invoke_behaviour(e, "stop").unwrap();
        assert_eq!(state.world.get::<Velocity>(e).unwrap().linear, Vec3::ZERO);
        assert_eq!(state.get_component_field(e, "Health", "current"), Ok(FieldValue::Float(0.5)));
        assert_eq!(
            state.invoke_behaviour(e, "dance"),
            Err(BridgeError::UnknownBehaviour("dance".into()))
        );
    }
}
