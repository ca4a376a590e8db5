mod contact;
mod share;
