//! Solidity interface of the collection contract

use minter_common::alloy::sol;

sol! {
    /// Emitted once per minted item
    event NewEpicNFTMinted(address sender, uint256 tokenId);

    /// Mint one item to the caller
    function makeAnEpicNFT() external;

    /// Number of items minted so far
    function getMintedCount() external view returns (uint256);
}
