use ethers::contract::abigen;

abigen!(
    AccountabilityLedger,
    r#"[
        function insertIdentity(uint256 identityCommitment) external
        function getIdentityCommitments() external view returns (uint256[])
        function reportData(uint256 externalNullifier) external payable
        function blowWhistle(bytes signal, uint256[2] a, uint256[2][2] b, uint256[2] c, uint256[4] input) external
        function seizeDeposit() external
        function totalLockedWei() external view returns (uint256)
        function totalSeizedWei() external view returns (uint256)
        function retrievableDeposit() external view returns (uint256)
        function owner() external view returns (address)
        event DataReported(uint256 indexed externalNullifier, uint256 deposit)
        event WhistleBlown(uint256 indexed nullifierHash, uint256 externalNullifier)
        event DepositSeized(address indexed investigator, uint256 amount)
    ]"#
);

abigen!(
    MembershipSet,
    r#"[
        function transferOwnership(address newOwner) external
        function owner() external view returns (address)
        function root() external view returns (uint256)
        event OwnershipTransferred(address indexed previousOwner, address indexed newOwner)
    ]"#
);
