//! Intent handlers
//!
//! The only place world mutation happens. The routing table is an
//! exhaustive match over the sealed intent union: adding a variant breaks
//! this file until it is handled.

pub(crate) mod combat;
pub(crate) mod items;
pub(crate) mod movement;
pub(crate) mod observation;
pub(crate) mod quests;
pub(crate) mod skills;
pub(crate) mod social;
pub(crate) mod system;

use delver_domain::GameResult;

use crate::intent::Intent;
use crate::world::World;

/// Dispatch one intent to its handler
pub(crate) async fn route(world: &mut World, intent: Intent) -> GameResult<()> {
    match intent {
        Intent::Move { direction } => movement::handle_move(world, &direction).await,
        Intent::Look => observation::handle_look(world).await,
        Intent::Search => observation::handle_search(world).await,
        Intent::Interact { target } => observation::handle_interact(world, &target).await,
        Intent::Check { target } => observation::handle_check(world, &target),
        Intent::Take { item } => items::handle_take(world, &item).await,
        Intent::TakeAll => items::handle_take_all(world).await,
        Intent::Drop { item } => items::handle_drop(world, &item).await,
        Intent::Give { item, npc } => items::handle_give(world, &item, &npc).await,
        Intent::Equip { item } => items::handle_equip(world, &item),
        Intent::Unequip { slot } => items::handle_unequip(world, slot),
        Intent::Use { item, action } => items::handle_use(world, &item, action.as_deref()).await,
        Intent::Craft { recipe } => items::handle_craft(world, &recipe).await,
        Intent::BuyItem { item } => items::handle_buy(world, &item).await,
        Intent::SellItem { item } => items::handle_sell(world, &item).await,
        Intent::ListStock => items::handle_list_stock(world),
        Intent::Pickpocket { npc } => items::handle_pickpocket(world, &npc).await,
        Intent::Plant { item, npc } => items::handle_plant(world, &item, &npc).await,
        Intent::Loot => items::handle_loot(world).await,
        Intent::Attack { target } => combat::handle_attack(world, &target).await,
        Intent::Flee => combat::handle_flee(world).await,
        Intent::Talk { npc } => social::handle_talk(world, &npc).await,
        Intent::Say { text } => social::handle_say(world, &text).await,
        Intent::AskQuestion { npc, topic } => {
            social::handle_ask(world, npc.as_deref(), &topic).await
        }
        Intent::Emote { keyword, target } => {
            social::handle_emote(world, &keyword, target.as_deref()).await
        }
        Intent::Persuade { target } => {
            social::handle_challenge(world, &target, delver_domain::SocialChallengeKind::Persuade)
                .await
        }
        Intent::Intimidate { target } => {
            social::handle_challenge(world, &target, delver_domain::SocialChallengeKind::Intimidate)
                .await
        }
        Intent::UseSkill { skill, target } => {
            skills::handle_use_skill(world, &skill, target.as_deref()).await
        }
        Intent::TrainSkill { skill } => skills::handle_train(world, &skill).await,
        Intent::ChoosePerk { skill, perk } => skills::handle_choose_perk(world, &skill, &perk).await,
        Intent::ViewSkills => skills::handle_view_skills(world),
        Intent::Quests => quests::handle_list(world),
        Intent::AcceptQuest { title } => quests::handle_accept(world, &title),
        Intent::AbandonQuest { title } => quests::handle_abandon(world, &title),
        Intent::ClaimReward { title } => quests::handle_claim(world, &title).await,
        Intent::Inventory => items::handle_inventory(world),
        Intent::Save { name } => system::handle_save(world, &name).await,
        Intent::Load { name } => system::handle_load(world, &name).await,
        Intent::Help => system::handle_help(world),
        Intent::Quit => system::handle_quit(world),
        Intent::Unknown { raw } => system::handle_unknown(world, &raw),
    }
}
