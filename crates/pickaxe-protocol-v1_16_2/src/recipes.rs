use crate::packets::{RECIPE_BOOK_DATA, RECIPE_BOOK_STATE, SEEN_RECIPE, UNLOCK_RECIPES};
use pickaxe_protocol_core::{
    Direction, FieldValue, HandlerKey, PacketContext, ProtocolError, ProtocolResult, State, Target,
    TranslatorBuilder,
};
use tracing::trace;

const BOOKS: usize = 4;

/// Recipe book data of 1.16.1: which of the two kinds follows.
const DATA_DISPLAYED_RECIPE: i32 = 0;
const DATA_SETTINGS: i32 = 1;

/// Open and filter flags of the crafting, furnace, blast furnace and smoker
/// books, in that order. A 1.16.1 server only knows about the first two and
/// wants all of them at once, so the client's last word on each is kept here.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RecipeBookState {
    flags: [bool; BOOKS * 2],
}

impl RecipeBookState {
    pub fn set(&mut self, book: usize, open: bool, filter: bool) {
        self.flags[book * 2] = open;
        self.flags[book * 2 + 1] = filter;
    }

    pub fn flags(&self) -> [bool; BOOKS * 2] {
        self.flags
    }
}

fn with_state<R>(ctx: &PacketContext<'_>, f: impl FnOnce(&mut RecipeBookState) -> R) -> ProtocolResult<R> {
    ctx.user()
        .with(ctx.translator().id(), f)
        .ok_or(ProtocolError::Precondition("recipe book state missing from connection storage"))
}

pub fn register(builder: &mut TranslatorBuilder) {
    let owner = builder.id();
    builder.on_init(move |user| user.put(owner, RecipeBookState::default()));

    // 1.16.2 added the blast furnace and smoker books to the settings.
    builder.register(
        HandlerKey::id(State::Play, Direction::Clientbound, UNLOCK_RECIPES),
        Target::Auto,
        |envelope, ctx| {
            envelope.passthrough_varint()?;
            let mut known = [false; 4];
            for flag in known.iter_mut() {
                *flag = envelope.passthrough_bool()?;
            }
            let flags = with_state(ctx, |state| {
                state.set(0, known[0], known[1]);
                state.set(1, known[2], known[3]);
                state.flags()
            })?;
            for flag in &flags[4..] {
                envelope.write(FieldValue::Bool(*flag));
            }
            Ok(())
        },
    );

    builder.register(
        HandlerKey::id(State::Play, Direction::Serverbound, RECIPE_BOOK_STATE),
        Target::Id(RECIPE_BOOK_DATA),
        |envelope, ctx| {
            let book = envelope.read_varint()?;
            let open = envelope.read_bool()?;
            let filter = envelope.read_bool()?;
            let book = usize::try_from(book)
                .ok()
                .filter(|book| *book < BOOKS)
                .ok_or_else(|| ProtocolError::violation(format!("unknown recipe book {}", book)))?;
            let flags = with_state(ctx, |state| {
                state.set(book, open, filter);
                state.flags()
            })?;
            trace!("[{}] recipe book settings {:?}", ctx.user().id(), flags);
            envelope.write(FieldValue::VarInt(DATA_SETTINGS));
            for flag in flags {
                envelope.write(FieldValue::Bool(flag));
            }
            Ok(())
        },
    );

    builder.register(
        HandlerKey::id(State::Play, Direction::Serverbound, SEEN_RECIPE),
        Target::Id(RECIPE_BOOK_DATA),
        |envelope, _| {
            let recipe = envelope.read_string()?;
            envelope.write(FieldValue::VarInt(DATA_DISPLAYED_RECIPE));
            envelope.write(FieldValue::String(recipe));
            Ok(())
        },
    );
}
