use engine::SignalName;

/// The game's signal vocabulary. Names are data, not behavior; emitters and
/// subscribers agree on the payload shape per signal.
pub(crate) const HERO_POSITION: SignalName = "hero_position";
pub(crate) const HERO_PICKS_UP_ITEM: SignalName = "hero_picks_up_item";
pub(crate) const HERO_EXITS: SignalName = "hero_exits";
pub(crate) const HERO_REQUESTS_ACTION: SignalName = "hero_requests_action";
pub(crate) const HERO_ATTACK_ACTION: SignalName = "hero_attack_action";
pub(crate) const HERO_CHANGE_EQUIPMENT: SignalName = "hero_change_equipment";
pub(crate) const HERO_EXP_CHANGED: SignalName = "hero_exp_changed";
pub(crate) const RESOURCE_DESTROYED: SignalName = "resource_destroyed";
pub(crate) const CHANGE_LEVEL: SignalName = "change_level";
pub(crate) const LEVEL_CHANGED: SignalName = "level_changed";
pub(crate) const TEXTBOX_START: SignalName = "textbox_start";
pub(crate) const TEXTBOX_END: SignalName = "textbox_end";
