//! System handlers: save, load, help, quit, unknown input

use delver_domain::{GameResult, SystemLevel};

use crate::world::World;

pub(crate) async fn handle_save(world: &mut World, name: &str) -> GameResult<()> {
    world.save_snapshot(name).await?;
    world
        .events
        .system(SystemLevel::Info, format!("Saved as '{name}'."));
    Ok(())
}

pub(crate) async fn handle_load(world: &mut World, name: &str) -> GameResult<()> {
    world.load_save(name).await?;
    world
        .events
        .system(SystemLevel::Info, format!("Loaded '{name}'."));
    super::movement::describe_current_space(world)?;
    Ok(())
}

const HELP_TEXT: &str = "\
Commands:
  movement     go <direction>, or just: north, n, climb the ladder
  senses       look, search, examine <thing>, check <thing>
  items        take <item>, take all, drop, give <item> to <npc>,
               equip/unequip, use/burn/throw/pour/climb <item>, inventory
  combat       attack <target>, flee
  people       talk <npc>, say <words>, ask <npc> about <topic>,
               smile/wave/bow/... at <npc>, persuade, intimidate
  skills       skills, skill <name>, train <name>, perk <skill> <perk>
  trade        stock, buy <item>, sell <item>
  underworld   pickpocket <npc>, plant <item> on <npc>, loot
  quests       quests, accept <title>, abandon <title>, claim <title>
  meta         save [name], load [name], help, quit";

pub(crate) fn handle_help(world: &mut World) -> GameResult<()> {
    world.events.narrative(HELP_TEXT);
    Ok(())
}

pub(crate) fn handle_quit(world: &mut World) -> GameResult<()> {
    world.quit_requested = true;
    world
        .events
        .system(SystemLevel::Info, "The dark will keep until you return.");
    Ok(())
}

pub(crate) fn handle_unknown(world: &mut World, raw: &str) -> GameResult<()> {
    let hint = if raw.is_empty() {
        "Say something. 'help' lists what I understand.".to_string()
    } else {
        format!("I don't know how to \"{raw}\". Try 'help'.")
    };
    world.events.system(SystemLevel::Info, hint);
    Ok(())
}
