//! Writes the SDL of Phrasebook's GraphQL API to `schema.graphql` at build
//! time. There is no code in here.
