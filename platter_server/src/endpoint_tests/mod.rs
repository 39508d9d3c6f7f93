mod cart;
mod helpers;
mod identity;
mod orders;
